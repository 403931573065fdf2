/// Injected once, right after first navigation. Wraps the three
/// blocking dialog primitives so a script-triggered dialog never stalls
/// the browser: each call is recorded into a page-scoped buffer and
/// answered with a safe default instead of being shown.
pub const DIALOG_INTERCEPTOR_SCRIPT: &str = r#"
(() => {
  if (window.__runDialogBuffer) return 'already-installed';
  window.__runDialogBuffer = [];
  const record = (kind, args) => window.__runDialogBuffer.push({ kind, args });
  window.alert = (msg) => { record('alert', [msg]); return undefined; };
  window.confirm = (msg) => { record('confirm', [msg]); return false; };
  window.prompt = (msg, def) => { record('prompt', [msg, def]); return null; };
  return 'installed';
})();
"#;

/// Reads and clears the dialog buffer, returning how many calls were
/// intercepted since the last read.
pub const DRAIN_DIALOG_BUFFER_SCRIPT: &str = r#"
(() => {
  const buf = window.__runDialogBuffer || [];
  window.__runDialogBuffer = [];
  return buf.length;
})();
"#;
