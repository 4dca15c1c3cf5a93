//! Notifier that only logs. Used when no notification endpoint is configured.

use tracing::info;

use intake_wizard::{NotificationRequest, Notifier, NotifyError};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, request: &NotificationRequest) -> Result<(), NotifyError> {
        info!(
            form_type = %request.form_type,
            applicant = request.applicant_name.as_deref().unwrap_or("-"),
            advisor = request.advisor_email.as_deref().unwrap_or("-"),
            "advisor notification (log only)"
        );
        Ok(())
    }
}
