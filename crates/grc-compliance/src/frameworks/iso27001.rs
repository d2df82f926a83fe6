//! ISO/IEC 27001:2022 Annex A

use super::FrameworkDef;

pub const ID: &str = "iso27001";

/// ISO 27001 Annex A hierarchy.
///
/// The `A` root is never declared; it is created as an implicit grouping node.
pub fn definition() -> FrameworkDef {
    FrameworkDef {
        id: ID,
        name: "ISO 27001",
        full_name: "ISO/IEC 27001:2022 Information Security Management",
        color: "#059669",
        requirements: &[
            ("A.5", "Organizational controls", true),
            ("A.5.1", "Policies for information security", true),
            ("A.5.15", "Access control", true),
            ("A.5.19", "Information security in supplier relationships", true),
            ("A.5.24", "Incident management planning and preparation", true),
            ("A.5.30", "ICT readiness for business continuity", true),
            ("A.6", "People controls", true),
            ("A.6.1", "Screening", true),
            ("A.6.3", "Information security awareness, education and training", true),
            ("A.8", "Technological controls", true),
            ("A.8.5", "Secure authentication", true),
            ("A.8.7", "Protection against malware", true),
            ("A.8.8", "Management of technical vulnerabilities", true),
            ("A.8.13", "Information backup", true),
            ("A.8.15", "Logging", true),
            ("A.8.24", "Use of cryptography", true),
            ("A.8.32", "Change management", true),
        ],
    }
}
