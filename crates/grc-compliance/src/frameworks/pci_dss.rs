//! PCI-DSS 4.0

use super::FrameworkDef;

pub const ID: &str = "pci_dss";

/// PCI-DSS requirement hierarchy.
///
/// Intermediate sub-requirements (e.g. `1.2`) are left implicit.
pub fn definition() -> FrameworkDef {
    FrameworkDef {
        id: ID,
        name: "PCI-DSS",
        full_name: "Payment Card Industry Data Security Standard v4.0",
        color: "#7c3aed",
        requirements: &[
            ("1", "Install and maintain network security controls", true),
            ("1.2.1", "Configuration standards for network security controls", true),
            ("3", "Protect stored account data", true),
            ("3.5.1", "PAN is rendered unreadable wherever it is stored", true),
            ("4", "Protect cardholder data with strong cryptography during transmission", true),
            ("4.2.1", "Strong cryptography safeguards PAN during transmission", true),
            ("5", "Protect all systems and networks from malicious software", true),
            ("5.2.1", "Anti-malware solution deployed on all system components", true),
            ("6", "Develop and maintain secure systems and software", true),
            ("6.3.3", "Security patches installed within one month of release", true),
            ("6.5.1", "Changes to system components are managed", true),
            ("7", "Restrict access by business need to know", true),
            ("7.2.1", "Access control model defined", true),
            ("8", "Identify users and authenticate access", true),
            ("8.3.1", "Strong authentication for users and administrators", true),
            ("8.4.2", "MFA for all access into the cardholder data environment", true),
            ("10", "Log and monitor all access", true),
            ("10.2.1", "Audit logs enabled and active for all system components", true),
            ("11", "Test security of systems and networks regularly", true),
            ("11.3.1", "Internal vulnerability scans performed quarterly", true),
            ("12", "Support information security with organizational policies", true),
            ("12.1.1", "Information security policy established and published", true),
            ("12.6.1", "Security awareness program implemented", true),
            ("12.8.1", "Third-party service provider list maintained", true),
            ("12.10.1", "Incident response plan exists and is ready", true),
        ],
    }
}
