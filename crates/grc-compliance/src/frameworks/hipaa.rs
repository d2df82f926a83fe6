//! HIPAA Security Rule
//!
//! Implementation specifications are either required (R) or addressable (A).
//! Addressable leaves accept an addressable decision during assessment.

use super::FrameworkDef;

pub const ID: &str = "hipaa";

/// HIPAA safeguard hierarchy
pub fn definition() -> FrameworkDef {
    FrameworkDef {
        id: ID,
        name: "HIPAA",
        full_name: "HIPAA Security Rule (45 CFR Part 164 Subpart C)",
        color: "#dc2626",
        requirements: &[
            // Administrative Safeguards
            ("1", "Administrative Safeguards", true),
            ("1.1", "Security Management Process", true),
            ("1.1.1", "Risk Analysis", true),
            ("1.1.2", "Risk Management", true),
            ("1.1.3", "Sanction Policy", true),
            ("1.1.4", "Information System Activity Review", true),
            ("1.2", "Security Awareness and Training", true),
            ("1.2.1", "Security Reminders", false),
            ("1.2.2", "Protection from Malicious Software", false),
            ("1.2.3", "Log-in Monitoring", false),
            ("1.2.4", "Password Management", false),
            ("1.3", "Contingency Plan", true),
            ("1.3.1", "Data Backup Plan", true),
            ("1.3.2", "Disaster Recovery Plan", true),
            ("1.3.3", "Testing and Revision Procedures", false),
            // Physical Safeguards
            ("2", "Physical Safeguards", true),
            ("2.1", "Facility Access Controls", true),
            ("2.1.1", "Contingency Operations", false),
            ("2.1.2", "Facility Security Plan", false),
            // Technical Safeguards
            ("3", "Technical Safeguards", true),
            ("3.1", "Access Control", true),
            ("3.1.1", "Unique User Identification", true),
            ("3.1.2", "Emergency Access Procedure", true),
            ("3.1.3", "Automatic Logoff", false),
            ("3.1.4", "Encryption and Decryption", false),
            ("3.2", "Audit Controls", true),
            ("3.3", "Person or Entity Authentication", true),
            ("3.4", "Transmission Security", true),
            ("3.4.1", "Integrity Controls", false),
            ("3.4.2", "Encryption", false),
        ],
    }
}
