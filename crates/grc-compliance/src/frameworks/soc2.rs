//! SOC 2 Trust Services Criteria (Security + Availability)

use super::FrameworkDef;

pub const ID: &str = "soc2";

/// SOC 2 requirement hierarchy
pub fn definition() -> FrameworkDef {
    FrameworkDef {
        id: ID,
        name: "SOC 2",
        full_name: "SOC 2 Type II - Trust Services Criteria",
        color: "#2563eb",
        requirements: &[
            // CC1 - Control Environment
            ("CC1", "Control Environment", true),
            ("CC1.1", "Commitment to integrity and ethical values", true),
            ("CC1.4", "Commitment to attract and retain competent individuals", true),
            // CC2 - Communication and Information
            ("CC2", "Communication and Information", true),
            ("CC2.2", "Internal communication of security responsibilities", true),
            // CC3 - Risk Assessment
            ("CC3", "Risk Assessment", true),
            ("CC3.2", "Identification and analysis of risk", true),
            // CC6 - Logical and Physical Access Controls
            ("CC6", "Logical and Physical Access Controls", true),
            ("CC6.1", "Logical access security software and architecture", true),
            ("CC6.2", "User registration and authorization", true),
            ("CC6.3", "Role-based access and least privilege", true),
            ("CC6.7", "Restriction of data transmission", true),
            ("CC6.8", "Prevention of unauthorized or malicious software", true),
            // CC7 - System Operations
            ("CC7", "System Operations", true),
            ("CC7.1", "Detection of configuration changes and vulnerabilities", true),
            ("CC7.2", "Monitoring of system components for anomalies", true),
            ("CC7.4", "Incident response program", true),
            // CC8 - Change Management
            ("CC8", "Change Management", true),
            ("CC8.1", "Authorization and testing of changes", true),
            // CC9 - Risk Mitigation
            ("CC9", "Risk Mitigation", true),
            ("CC9.1", "Business disruption risk mitigation", true),
            ("CC9.2", "Vendor and business partner risk", true),
            // A1 - Availability
            ("A1", "Availability", true),
            ("A1.2", "Backup and recovery infrastructure", true),
            ("A1.3", "Recovery plan testing", true),
        ],
    }
}
