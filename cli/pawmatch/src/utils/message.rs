use std::fmt::Display;

use pawmatch_sdk::models::notification::{NoticeKind, Notification};

/// Write a message to stderr.
///
/// This is a wrapper around `eprintln!` that can be further extended
/// to include logging, word wrapping, ANSI filtereing etc.
fn print_message(v: impl Display) {
    #[cfg(test)]
    {
        let history = crate::utils::message::history::History::global();
        history.push_message(format!("{v}"));
    }

    eprintln!("{v}");
}

/// alias for [print_message]
pub(crate) fn plain(v: impl Display) {
    print_message(v);
}
pub(crate) fn error(v: impl Display) {
    print_message(std::format_args!("❌ ERROR: {v}"));
}
pub(crate) fn updated(v: impl Display) {
    print_message(std::format_args!("✅ {v}"));
}
/// double width character, add an additional space for alignment
pub(crate) fn warning(v: impl Display) {
    print_message(std::format_args!("⚠️  {v}"));
}
pub(crate) fn info(v: impl Display) {
    print_message(std::format_args!("ℹ️  {v}"));
}

/// Print a notification from the browsing session
pub(crate) fn notice(notification: &Notification) {
    match notification.kind {
        NoticeKind::AuthenticationFailed | NoticeKind::SessionExpired => error(notification),
        NoticeKind::Transient => warning(notification),
        NoticeKind::EmptySelection => info(notification),
    }
}
