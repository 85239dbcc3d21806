//! Outbound error-display seam.
//!
//! The dispatcher raises exactly one side effect on failure: a destructive
//! toast carrying the normalized message. What renders it is up to the host.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    Default,
    Destructive,
}

/// A user notification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn error(description: &str) -> Self {
        Self {
            title: "Error".to_string(),
            description: description.to_string(),
            variant: ToastVariant::Destructive,
        }
    }
}

/// Receives toasts for errors that should be shown to the user.
pub trait ErrorNotifier: Send + Sync {
    fn notify(&self, toast: &Toast);
}

/// Default notifier for hosts without a UI: logs the toast.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl ErrorNotifier for TracingNotifier {
    fn notify(&self, toast: &Toast) {
        tracing::warn!(title = %toast.title, description = %toast.description, "error toast");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_toast_is_destructive() {
        let toast = Toast::error("Server error occurred");
        assert_eq!(toast.title, "Error");
        assert_eq!(toast.variant, ToastVariant::Destructive);
        let json = serde_json::to_value(&toast).unwrap();
        assert_eq!(json["variant"], "destructive");
        assert_eq!(json["description"], "Server error occurred");
    }
}
