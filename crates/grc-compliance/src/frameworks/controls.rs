//! Built-in control set

use super::{hipaa, iso27001, pci_dss, soc2};
use crate::catalog::{Control, ControlMapping, RiskLevel};

struct ControlBuilder(Control);

fn control(id: &str, title: &str, domain: &str, risk_level: RiskLevel) -> ControlBuilder {
    ControlBuilder(Control {
        id: id.into(),
        title: title.to_string(),
        description: String::new(),
        question: String::new(),
        domain: domain.into(),
        risk_level,
        mappings: Vec::new(),
        guidance: String::new(),
        evidence_example: String::new(),
        remediation_hint: String::new(),
        custom: false,
    })
}

impl ControlBuilder {
    fn describe(mut self, description: &str, question: &str) -> Self {
        self.0.description = description.to_string();
        self.0.question = question.to_string();
        self
    }

    fn guidance(mut self, guidance: &str, evidence: &str, remediation: &str) -> Self {
        self.0.guidance = guidance.to_string();
        self.0.evidence_example = evidence.to_string();
        self.0.remediation_hint = remediation.to_string();
        self
    }

    /// Map to clauses of one framework; titles are filled from the tree
    fn maps(mut self, framework: &str, clauses: &[&str]) -> Self {
        self.0
            .mappings
            .extend(clauses.iter().map(|clause| ControlMapping::new(framework, clause, "")));
        self
    }

    fn build(self) -> Control {
        self.0
    }
}

/// Get built-in controls
pub fn builtin_controls() -> Vec<Control> {
    vec![
        // Access Control
        control("AC-01", "Multi-Factor Authentication", "access-control", RiskLevel::Critical)
            .describe(
                "MFA is required for all workforce and administrative access",
                "Is multi-factor authentication enforced for all users and administrators?",
            )
            .guidance(
                "Enforce MFA at the identity provider; prefer phishing-resistant factors",
                "IdP MFA policy export, enrollment report",
                "Enable conditional access requiring MFA for every application",
            )
            .maps(soc2::ID, &["CC6.1"])
            .maps(iso27001::ID, &["A.8.5"])
            .maps(hipaa::ID, &["3.3"])
            .maps(pci_dss::ID, &["8.4.2", "8.3.1"])
            .build(),
        control("AC-02", "Role-Based Access Control", "access-control", RiskLevel::High)
            .describe(
                "Access is granted by role following least privilege",
                "Is access to systems granted through defined roles with least privilege?",
            )
            .guidance(
                "Define roles per job function and avoid direct user grants",
                "Role matrix, RBAC configuration export",
                "Document roles and migrate direct grants to role assignments",
            )
            .maps(soc2::ID, &["CC6.3"])
            .maps(iso27001::ID, &["A.5.15"])
            .maps(hipaa::ID, &["3.1.1"])
            .maps(pci_dss::ID, &["7.2.1"])
            .build(),
        control("AC-03", "Access Provisioning and Reviews", "access-control", RiskLevel::High)
            .describe(
                "Access requests are approved and entitlements reviewed quarterly",
                "Are user access requests approved and access rights reviewed at least quarterly?",
            )
            .guidance(
                "Tie provisioning to HR events and run quarterly recertification",
                "Access review sign-off, provisioning tickets",
                "Schedule quarterly access reviews with system owners",
            )
            .maps(soc2::ID, &["CC6.2"])
            .maps(iso27001::ID, &["A.5.15"])
            .build(),
        control("AC-04", "Automatic Session Logoff", "access-control", RiskLevel::Medium)
            .describe(
                "Inactive sessions terminate automatically",
                "Do sessions automatically log off after a period of inactivity?",
            )
            .guidance(
                "Set idle timeouts of 15 minutes or less on systems handling sensitive data",
                "Session timeout configuration",
                "Configure idle session timeouts in applications and endpoints",
            )
            .maps(hipaa::ID, &["3.1.3"])
            .build(),
        control("AC-05", "Password Policy", "access-control", RiskLevel::Medium)
            .describe(
                "Passwords meet length and complexity requirements",
                "Is a password policy enforced requiring at least 12 characters?",
            )
            .guidance(
                "Follow current NIST guidance; screen against breached password lists",
                "Password policy configuration screenshot",
                "Update the identity provider password policy",
            )
            .maps(hipaa::ID, &["1.2.4"])
            .maps(pci_dss::ID, &["8.3.1"])
            .build(),
        // Cryptography
        control("CR-01", "Encryption at Rest", "cryptography", RiskLevel::Critical)
            .describe(
                "Sensitive data is encrypted when stored",
                "Is all sensitive data encrypted at rest with AES-256 or equivalent?",
            )
            .guidance(
                "Use managed key services and rotate keys annually",
                "Storage encryption settings, KMS key policy",
                "Enable default encryption on databases, volumes and object storage",
            )
            .maps(iso27001::ID, &["A.8.24"])
            .maps(hipaa::ID, &["3.1.4"])
            .maps(pci_dss::ID, &["3.5.1"])
            .build(),
        control("CR-02", "Encryption in Transit", "cryptography", RiskLevel::High)
            .describe(
                "Data is encrypted during transmission",
                "Is TLS 1.2 or higher enforced on all external and internal connections?",
            )
            .guidance(
                "Disable legacy protocols and weak cipher suites",
                "TLS scan results, load balancer listener policy",
                "Enforce TLS 1.2+ and redirect plaintext endpoints",
            )
            .maps(soc2::ID, &["CC6.7"])
            .maps(iso27001::ID, &["A.8.24"])
            .maps(hipaa::ID, &["3.4.2", "3.4.1"])
            .maps(pci_dss::ID, &["4.2.1"])
            .build(),
        // Operations Security
        control("OP-01", "Centralized Audit Logging", "operations-security", RiskLevel::High)
            .describe(
                "Security events are collected centrally and retained",
                "Are audit logs from all production systems collected centrally and retained for at least one year?",
            )
            .guidance(
                "Forward logs to a SIEM and alert on authentication anomalies",
                "SIEM source inventory, retention settings",
                "Onboard remaining systems to the central log pipeline",
            )
            .maps(soc2::ID, &["CC7.2"])
            .maps(iso27001::ID, &["A.8.15"])
            .maps(hipaa::ID, &["3.2", "1.2.3"])
            .maps(pci_dss::ID, &["10.2.1"])
            .build(),
        control("OP-02", "Vulnerability Scanning", "operations-security", RiskLevel::High)
            .describe(
                "Infrastructure is scanned for vulnerabilities on a schedule",
                "Are internal and external vulnerability scans run at least quarterly?",
            )
            .guidance(
                "Scan authenticated where possible and track findings to closure",
                "Scan reports, remediation tickets",
                "Schedule recurring scans and define remediation SLAs",
            )
            .maps(soc2::ID, &["CC7.1"])
            .maps(iso27001::ID, &["A.8.8"])
            .maps(pci_dss::ID, &["11.3.1"])
            .build(),
        control("OP-03", "Patch Management", "operations-security", RiskLevel::High)
            .describe(
                "Security patches are applied within defined SLAs",
                "Are critical security patches applied within 30 days of release?",
            )
            .guidance(
                "Automate patch deployment and report on exceptions",
                "Patch compliance report",
                "Adopt automated patching with a documented exception process",
            )
            .maps(iso27001::ID, &["A.8.8"])
            .maps(pci_dss::ID, &["6.3.3"])
            .build(),
        control("OP-04", "Anti-Malware Protection", "operations-security", RiskLevel::Medium)
            .describe(
                "Endpoints and servers run anti-malware protection",
                "Is anti-malware or EDR deployed on all endpoints and servers?",
            )
            .guidance(
                "Deploy EDR with central management and tamper protection",
                "EDR coverage dashboard",
                "Roll out EDR to unprotected assets",
            )
            .maps(soc2::ID, &["CC6.8"])
            .maps(iso27001::ID, &["A.8.7"])
            .maps(hipaa::ID, &["1.2.2"])
            .maps(pci_dss::ID, &["5.2.1"])
            .build(),
        control("OP-05", "Change Management", "operations-security", RiskLevel::Medium)
            .describe(
                "Production changes are reviewed, tested and approved",
                "Are production changes peer reviewed and approved before deployment?",
            )
            .guidance(
                "Require pull request approval and CI checks before merge",
                "Branch protection settings, change tickets",
                "Enable branch protection and a change approval workflow",
            )
            .maps(soc2::ID, &["CC8.1"])
            .maps(iso27001::ID, &["A.8.32"])
            .maps(pci_dss::ID, &["6.5.1"])
            .build(),
        control("OP-06", "Network Security Configuration", "operations-security", RiskLevel::High)
            .describe(
                "Firewall and security group rules follow documented standards",
                "Are network security rules documented, justified and reviewed every six months?",
            )
            .guidance(
                "Deny by default and document the business need for each rule",
                "Firewall rule review records",
                "Review and prune network rules against a baseline",
            )
            .maps(pci_dss::ID, &["1.2.1"])
            .build(),
        // Business Continuity
        control("BC-01", "Data Backups", "business-continuity", RiskLevel::High)
            .describe(
                "Critical data is backed up and restorable",
                "Are critical systems backed up daily with backups stored separately?",
            )
            .guidance(
                "Keep immutable off-site copies and test restores",
                "Backup job history, restore test records",
                "Configure daily backups with cross-region copies",
            )
            .maps(soc2::ID, &["A1.2"])
            .maps(iso27001::ID, &["A.8.13"])
            .maps(hipaa::ID, &["1.3.1"])
            .build(),
        control("BC-02", "Disaster Recovery Plan", "business-continuity", RiskLevel::Medium)
            .describe(
                "A disaster recovery plan exists and is tested annually",
                "Is there a documented disaster recovery plan tested at least annually?",
            )
            .guidance(
                "Define RTO/RPO per system and run tabletop or failover tests",
                "DR plan, test report",
                "Write the DR plan and schedule an annual test",
            )
            .maps(soc2::ID, &["CC9.1", "A1.3"])
            .maps(iso27001::ID, &["A.5.30"])
            .maps(hipaa::ID, &["1.3.2", "1.3.3", "2.1.1"])
            .build(),
        // Incident Management
        control("IR-01", "Incident Response Plan", "incident-management", RiskLevel::High)
            .describe(
                "Security incidents are handled under a documented plan",
                "Is there an incident response plan with defined roles that is tested annually?",
            )
            .guidance(
                "Include escalation paths, communication templates and regulator notification",
                "IR plan, tabletop exercise notes",
                "Draft an IR plan and run a tabletop exercise",
            )
            .maps(soc2::ID, &["CC7.4"])
            .maps(iso27001::ID, &["A.5.24"])
            .maps(pci_dss::ID, &["12.10.1"])
            .build(),
        // Governance & Risk
        control("GV-01", "Risk Assessment", "governance", RiskLevel::Critical)
            .describe(
                "Security risks are assessed at least annually",
                "Is a formal security risk assessment performed at least annually?",
            )
            .guidance(
                "Maintain a risk register with owners and treatment plans",
                "Risk assessment report, risk register",
                "Perform a risk assessment and record treatments",
            )
            .maps(soc2::ID, &["CC3.2"])
            .maps(hipaa::ID, &["1.1.1", "1.1.2"])
            .build(),
        control("GV-02", "Information Security Policy", "governance", RiskLevel::Medium)
            .describe(
                "Security policies are approved by leadership and published",
                "Is an information security policy approved by management and communicated to staff?",
            )
            .guidance(
                "Review policies annually and track acknowledgement",
                "Signed policy, acknowledgement records",
                "Publish the policy and collect employee acknowledgements",
            )
            .maps(soc2::ID, &["CC1.1"])
            .maps(iso27001::ID, &["A.5.1"])
            .maps(hipaa::ID, &["1.1.3"])
            .maps(pci_dss::ID, &["12.1.1"])
            .build(),
        // People Security
        control("HR-01", "Security Awareness Training", "people-security", RiskLevel::Medium)
            .describe(
                "Staff complete security awareness training",
                "Do all employees complete security awareness training at hire and annually?",
            )
            .guidance(
                "Include phishing simulations and role-specific modules",
                "Training completion report",
                "Enroll all staff in an annual training program",
            )
            .maps(soc2::ID, &["CC2.2"])
            .maps(iso27001::ID, &["A.6.3"])
            .maps(hipaa::ID, &["1.2.1"])
            .maps(pci_dss::ID, &["12.6.1"])
            .build(),
        control("HR-02", "Background Screening", "people-security", RiskLevel::Low)
            .describe(
                "Candidates are screened before hire",
                "Are background checks performed for personnel before they are granted access?",
            )
            .guidance(
                "Scale screening depth with role sensitivity and local law",
                "Screening policy, HR checklist",
                "Add background checks to the hiring workflow",
            )
            .maps(soc2::ID, &["CC1.4"])
            .maps(iso27001::ID, &["A.6.1"])
            .build(),
        // Supplier Management
        control("VM-01", "Vendor Risk Management", "supplier-management", RiskLevel::Medium)
            .describe(
                "Vendors with data access are assessed before onboarding",
                "Are vendors with access to sensitive data security-reviewed before onboarding?",
            )
            .guidance(
                "Collect SOC reports or questionnaires and track renewals",
                "Vendor inventory, assessment records",
                "Build a vendor inventory and assessment process",
            )
            .maps(soc2::ID, &["CC9.2"])
            .maps(iso27001::ID, &["A.5.19"])
            .maps(pci_dss::ID, &["12.8.1"])
            .build(),
        // Physical Security
        control("PS-01", "Facility Security Plan", "physical-security", RiskLevel::Medium)
            .describe(
                "Facilities housing sensitive systems are physically protected",
                "Is there a facility security plan covering physical access to sensitive systems?",
            )
            .guidance(
                "Control badge access and keep visitor logs",
                "Facility security plan, visitor logs",
                "Document physical safeguards for each facility",
            )
            .maps(hipaa::ID, &["2.1.2"])
            .build(),
    ]
}
