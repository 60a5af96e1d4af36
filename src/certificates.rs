use crate::model::course::{CertificateDefinition, Course};

pub trait CertificateLookup: Send + Sync {
    /// Whether certificates are switched on for the course, along with every
    /// certificate definition it has.
    fn is_activated(&self, course: &Course) -> (bool, Vec<CertificateDefinition>);
}

/// Reads certificate definitions straight off the course. With the HTML certificate
/// view disabled, no course has certificates.
pub struct CourseCertificates {
    html_view_enabled: bool,
}

impl CourseCertificates {
    pub fn new(html_view_enabled: bool) -> Self {
        Self { html_view_enabled }
    }
}

impl CertificateLookup for CourseCertificates {
    fn is_activated(&self, course: &Course) -> (bool, Vec<CertificateDefinition>) {
        if !self.html_view_enabled {
            return (false, vec![]);
        }

        let certificates = course.certificates.clone();
        let is_active = certificates.iter().any(|c| c.is_active);
        (is_active, certificates)
    }
}
