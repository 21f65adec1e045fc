use argh::FromArgs;
use tracing::warn;
use web_time::Duration;

fn timeout_millis(value: &str) -> Result<Duration, String> {
    let millis: u64 = value
        .parse()
        .map_err(|e| format!("invalid sync timeout {value:?}: {e}"))?;

    if millis == 0 {
        return Err("sync timeout must be at least one millisecond".to_string());
    }

    Ok(Duration::from_millis(millis))
}

fn slot_count(value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(0) => Err("slot count must be positive".to_string()),
        Ok(count) => Ok(count),
        Err(e) => Err(format!("invalid slot count {value:?}: {e}")),
    }
}

/// Engine arguments
///
/// All options are hidden from the host application's help output, so they can be mixed with
/// the arguments of the program embedding the engine.
#[derive(Debug, Default, Clone, PartialEq, Eq, FromArgs)]
pub struct EngineArgs {
    /// run the render role on the logic thread instead of a dedicated render thread
    #[argh(switch, hidden_help)]
    pub single_threaded: bool,
    /// load assets on dedicated loader threads instead of the requesting thread
    #[argh(switch, hidden_help)]
    pub detached_loads: bool,

    /// upper bound for a blocking sync with the render thread, in milliseconds
    #[argh(option, hidden_help, from_str_fn(timeout_millis))]
    pub sync_timeout_ms: Option<Duration>,
    /// number of texture slots the backend provides
    #[argh(option, hidden_help, from_str_fn(slot_count))]
    pub texture_slots: Option<u32>,
    /// number of mesh slots the backend provides
    #[argh(option, hidden_help, from_str_fn(slot_count))]
    pub mesh_slots: Option<u32>,
}

impl EngineArgs {
    /// Parses the process arguments, falling back to the defaults when they don't parse.
    pub fn from_env() -> EngineArgs {
        let mut args = std::env::args();
        let Some(cmd_name) = args.next() else {
            return EngineArgs::default();
        };
        let args: Vec<String> = args.collect();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        Self::parse(&cmd_name, &args)
    }

    pub fn parse(cmd_name: &str, args: &[&str]) -> EngineArgs {
        match EngineArgs::from_args(&[cmd_name], args) {
            Ok(parsed) => parsed,
            Err(exit) => {
                warn!("Ignoring engine arguments: {}", exit.output.trim());
                EngineArgs::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_options() {
        let args = EngineArgs::parse(
            "game",
            &[
                "--single-threaded",
                "--detached-loads",
                "--sync-timeout-ms",
                "250",
                "--texture-slots",
                "64",
                "--mesh-slots",
                "8",
            ],
        );

        assert!(args.single_threaded);
        assert!(args.detached_loads);
        assert_eq!(args.sync_timeout_ms, Some(Duration::from_millis(250)));
        assert_eq!(args.texture_slots, Some(64));
        assert_eq!(args.mesh_slots, Some(8));
    }

    #[test]
    fn rejects_zero_values() {
        assert_eq!(
            EngineArgs::parse("game", &["--sync-timeout-ms", "0"]),
            EngineArgs::default()
        );
        assert_eq!(
            EngineArgs::parse("game", &["--texture-slots", "0"]),
            EngineArgs::default()
        );
    }

    #[test]
    fn unknown_arguments_fall_back_to_defaults() {
        let args = EngineArgs::parse("game", &["--fullscreen"]);
        assert_eq!(args, EngineArgs::default());
    }
}
