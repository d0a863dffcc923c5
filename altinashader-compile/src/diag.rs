//! Diagnostic string assembly shared by the backends and the dispatcher.

/// Appends `text` to `diagnostics` on a fresh line. Empty text is
/// dropped so that join logic never produces blank lines.
pub(crate) fn append_diagnostic(diagnostics: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !diagnostics.is_empty() {
        diagnostics.push('\n');
    }
    diagnostics.push_str(text);
}
