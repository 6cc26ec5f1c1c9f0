/// Options shared by every command, built once in `main` from the global flags
/// and handed down explicitly.
#[derive(Debug, Clone, Default)]
pub struct GlobalConfig {
    /// Print commands, event delivery failures and other diagnostics.
    pub debug: bool,
    /// Do not send telemetry events.
    pub skip_events: bool,
    /// Do not look for a newer CLI release.
    pub skip_version_check: bool,
}
