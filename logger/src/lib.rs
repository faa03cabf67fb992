use constants::ENV_PGISAM;
use lazy_static::lazy_static;
use log::LevelFilter;
use log4rs::{
    append::rolling_file::{
        policy::compound::{
            roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy,
        },
        RollingFileAppender,
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    Handle,
};
use std::path::{Path, PathBuf};

const LOG_FILE_SIZE: u64 = 1024 * 500;

// The logger is global to the process, mirroring the single `pgout` log
// file the original bridge wrote to. The first initialization creates the
// logger and hands back a config handle; the level can be changed later
// through that handle without restarting the process.
lazy_static! {
    /// Initializes the logger under `<BRIDGE>/logs`, falling back to the
    /// temp directory if `BRIDGE` is unset or not writable.
    ///
    /// Wrapped in `catch_unwind` so that a logger failure never crashes the
    /// bridge; in that case `Logger::init` returns `None` and nothing is
    /// written anywhere.
    static ref LOGGER: Option<Logger> = {
        let bridge_dir = std::env::var(constants::ENV_BRIDGE).unwrap_or_default();
        let pgisam = std::env::var(ENV_PGISAM).unwrap_or_default();

        match std::panic::catch_unwind(|| {
            let log_dir = Logger::get_log_dir(&bridge_dir);
            let log_dir_str = log_dir.to_str()?;
            let appender = Logger::file_appender(log_dir_str).ok()?;
            let (level_filter, trace_sql) = Logger::parse_pgisam(&pgisam);
            let handle = Logger::init_logger(appender, level_filter).ok()?;
            Some(Logger {
                handle,
                log_dir,
                trace_sql,
            })
        }) {
            Ok(logger) => logger,
            Err(_) => None,
        }
    };
}

#[derive(Debug)]
pub struct Logger {
    handle: Handle,
    log_dir: PathBuf,
    trace_sql: bool,
}

impl Logger {
    /// Whether `PGISAM` asked for executed SQL to be traced
    /// (the `sql` token).
    pub fn sql_trace_enabled() -> bool {
        LOGGER.as_ref().map(|l| l.trace_sql).unwrap_or(false)
    }

    /// Update the logger's level at runtime. Used when the bridge is asked
    /// to change `PGISAM` mid-process (the clone driver does this between
    /// tables when it wants a quieter pass).
    pub fn set_log_level(level_filter: LevelFilter) {
        if let Some(logger) = LOGGER.as_ref() {
            if let Some(log_dir) = logger.log_dir.to_str() {
                log::logger().flush();
                if let Ok(appender) = Logger::file_appender(log_dir) {
                    let config = Config::builder()
                        .appender(Appender::builder().build("logfile", Box::new(appender)))
                        .build(Root::builder().appender("logfile").build(level_filter))
                        .unwrap();
                    logger.handle.set_config(config);
                    log::logger().flush();
                }
            }
        }
    }

    /// Parse the `PGISAM` environment variable's space-separated tokens
    /// (`debug1|debug2|debug3|sql`) into a level filter plus a SQL-trace
    /// flag. Unrecognised or empty input yields `Info` with SQL tracing
    /// off, the original's default (`mNORMAL`).
    pub fn parse_pgisam(value: &str) -> (LevelFilter, bool) {
        let mut level = LevelFilter::Info;
        let mut trace_sql = false;

        for token in value.split_whitespace() {
            match token.to_lowercase().as_str() {
                "debug1" => level = level.max(LevelFilter::Info),
                "debug2" => level = level.max(LevelFilter::Debug),
                "debug3" | "trace" => level = level.max(LevelFilter::Trace),
                "sql" => trace_sql = true,
                _ => {}
            }
        }

        (level, trace_sql)
    }

    /// Create the file appender configuration to pass to the logger. The
    /// pattern stamps every record with a UTC date/time and the pid,
    /// matching the original's always-on `mDTSTAMP` behaviour.
    fn file_appender(log_dir: &str) -> Result<RollingFileAppender, std::io::Error> {
        let file_path = Path::new(log_dir)
            .join("pgisam.log")
            .to_str()
            .unwrap()
            .to_string();
        let roller_pattern = Path::new(log_dir)
            .join("pgisam.log.{}")
            .to_str()
            .unwrap()
            .to_string();

        let roller = FixedWindowRoller::builder()
            .build(&roller_pattern, 10)
            .unwrap();
        let trigger = SizeTrigger::new(LOG_FILE_SIZE);
        let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));

        RollingFileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(
                "{d(%Y-%m-%d %H:%M:%S)(utc)} [{P}] {h({l})}: {m}{n}",
            )))
            .append(true)
            .build(file_path, Box::new(policy))
    }

    /// Resolve the logging directory from the `BRIDGE` configuration
    /// directory, creating `<BRIDGE>/logs` if needed. Falls back to the
    /// temp directory when `bridge_dir` is empty or unusable.
    pub fn get_log_dir(bridge_dir: &str) -> PathBuf {
        if bridge_dir.is_empty() {
            return std::env::temp_dir();
        }

        let log_dir = Path::new(bridge_dir).join("logs");
        if std::fs::create_dir_all(&log_dir).is_ok() {
            log_dir
        } else {
            std::env::temp_dir()
        }
    }

    fn init_logger(logfile: RollingFileAppender, loglevel: LevelFilter) -> Result<Handle, ()> {
        let config = Config::builder()
            .appender(Appender::builder().build("logfile", Box::new(logfile)))
            .build(Root::builder().appender("logfile").build(loglevel))
            .map_err(|_e| ())?;

        log4rs::init_config(config).map_err(|_e| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_debug_levels() {
        assert_eq!(Logger::parse_pgisam("").0, LevelFilter::Info);
        assert_eq!(Logger::parse_pgisam("debug2").0, LevelFilter::Debug);
        assert_eq!(Logger::parse_pgisam("debug3 sql").0, LevelFilter::Trace);
        assert!(Logger::parse_pgisam("debug3 sql").1);
        assert!(!Logger::parse_pgisam("debug1").1);
    }

    #[test]
    fn empty_bridge_dir_falls_back_to_temp() {
        assert_eq!(Logger::get_log_dir(""), std::env::temp_dir());
    }
}
