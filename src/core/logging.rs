use std::fmt;

use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// `[HH:MM:SS] [LEVEL]: message`, local time, no target or spans.
pub struct CompactFormat;

impl<S, N> FormatEvent<S, N> for CompactFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(
            writer,
            "[{}] [{}]: ",
            chrono::Local::now().format("%H:%M:%S"),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Default filter; `RUST_LOG` takes precedence when set.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "info,lambda_loader=debug"
    } else {
        "info,lambda_loader=info"
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(CompactFormat)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_raises_crate_verbosity() {
        assert!(default_directive(true).ends_with("lambda_loader=debug"));
        assert!(default_directive(false).ends_with("lambda_loader=info"));
    }

    #[test]
    fn init_twice_is_harmless() {
        init(false);
        init(true);
        tracing::info!("logging initialised");
    }
}
