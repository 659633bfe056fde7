//! Instance configuration.
//!
//! The environment decides terminal output and verbosity, matching how mpvjs
//! has always been switched into debugging mode. Embedders can layer a JSON
//! overlay on top to change the runtime defaults applied after initialization.

use serde::Deserialize;

/// Environment variable enabling libmpv terminal output.
pub const TERMINAL_ENV: &str = "MPVJS_TERMINAL";
/// Environment variable enabling verbose libmpv and bridge logging.
pub const VERBOSE_ENV: &str = "MPVJS_VERBOSE";
/// Environment variable holding a tracing filter directive.
pub const LOG_ENV: &str = "MPVJS_LOG";

/// One `name=value` option passed to `mpv_set_option_string`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineOption {
    /// Option name without the leading dashes.
    pub name: String,
    /// Option value as libmpv parses it from the command line.
    pub value: String,
}

impl EngineOption {
    /// Create an option pair.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Settings read once when an instance starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Let libmpv print to the terminal.
    pub terminal: bool,
    /// Raise libmpv to `msg-level=all=v` and the bridge to `debug`.
    pub verbose: bool,
    /// Options applied in order after the render context exists.
    pub runtime_options: Vec<EngineOption>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            terminal: false,
            verbose: false,
            runtime_options: default_runtime_options(),
        }
    }
}

/// Defaults suited to an embedded player; the host can change any of them once
/// it receives `ready`.
fn default_runtime_options() -> Vec<EngineOption> {
    [
        ("stop-playback-on-init-failure", "no"),
        ("audio-file-auto", "no"),
        ("sub-auto", "no"),
        ("volume-max", "100"),
        ("keep-open", "no"),
        ("keep-open-pause", "no"),
        ("osd-bar", "no"),
        ("reset-on-next-file", "pause"),
        ("force-window", "immediate"),
    ]
    .into_iter()
    .map(|(name, value)| EngineOption::new(name, value))
    .collect()
}

/// Partial configuration accepted from the embedder as JSON.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Overlay {
    terminal: Option<bool>,
    verbose: Option<bool>,
    /// Replaces the default runtime options entirely.
    runtime_options: Option<Vec<EngineOption>>,
    /// Appended after the runtime options, so they win.
    extra_options: Vec<EngineOption>,
}

impl Config {
    /// Read the switches from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// A variable counts as set when it is present and non-empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |name: &str| lookup(name).is_some_and(|value| !value.is_empty());
        Self {
            terminal: flag(TERMINAL_ENV),
            verbose: flag(VERBOSE_ENV),
            ..Self::default()
        }
    }

    /// Apply a JSON overlay such as
    /// `{"verbose": true, "extra_options": [{"name": "hwdec", "value": "auto"}]}`.
    ///
    /// # Errors
    ///
    /// Returns the parse error when `json` is not a valid overlay; the
    /// configuration is left untouched in that case.
    pub fn apply_json(&mut self, json: &str) -> Result<(), serde_json::Error> {
        let overlay: Overlay = serde_json::from_str(json)?;
        if let Some(terminal) = overlay.terminal {
            self.terminal = terminal;
        }
        if let Some(verbose) = overlay.verbose {
            self.verbose = verbose;
        }
        if let Some(options) = overlay.runtime_options {
            self.runtime_options = options;
        }
        self.runtime_options.extend(overlay.extra_options);
        Ok(())
    }

    /// Options that libmpv only accepts before `mpv_initialize`.
    #[must_use]
    pub fn pre_init_options(&self) -> Vec<EngineOption> {
        let mut options = Vec::with_capacity(4);
        if self.terminal {
            options.push(EngineOption::new("terminal", "yes"));
        }
        if self.verbose {
            options.push(EngineOption::new("msg-level", "all=v"));
        }
        options.push(EngineOption::new("input-default-bindings", "yes"));
        options.push(EngineOption::new("idle", "yes"));
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_string())
        }
    }

    #[test]
    fn empty_variables_count_as_unset() {
        let config = Config::from_lookup(env(&[(TERMINAL_ENV, ""), (VERBOSE_ENV, "1")]));
        assert!(!config.terminal);
        assert!(config.verbose);
    }

    #[test]
    fn pre_init_options_follow_switches() {
        let names = |config: &Config| -> Vec<String> {
            config.pre_init_options().into_iter().map(|o| o.name).collect()
        };
        assert_eq!(names(&Config::default()), ["input-default-bindings", "idle"]);

        let config = Config {
            terminal: true,
            verbose: true,
            ..Config::default()
        };
        assert_eq!(
            names(&config),
            ["terminal", "msg-level", "input-default-bindings", "idle"]
        );
    }

    #[test]
    fn overlay_extends_runtime_options() {
        let mut config = Config::default();
        config
            .apply_json(r#"{"verbose": true, "extra_options": [{"name": "hwdec", "value": "auto"}]}"#)
            .unwrap();
        assert!(config.verbose);
        assert_eq!(config.runtime_options.len(), 10);
        assert_eq!(config.runtime_options[0].name, "stop-playback-on-init-failure");
        assert_eq!(config.runtime_options[9], EngineOption::new("hwdec", "auto"));
    }

    #[test]
    fn overlay_can_replace_defaults() {
        let mut config = Config::default();
        config
            .apply_json(r#"{"runtime_options": [{"name": "keep-open", "value": "yes"}]}"#)
            .unwrap();
        assert_eq!(config.runtime_options, [EngineOption::new("keep-open", "yes")]);
    }

    #[test]
    fn bad_overlay_leaves_config_untouched() {
        let mut config = Config::default();
        assert!(config.apply_json(r#"{"colour": "blue"}"#).is_err());
        assert_eq!(config, Config::default());
    }
}
