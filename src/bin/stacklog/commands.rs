// Subcommand implementations

use anyhow::{anyhow, Context as _, Result};
use stacklog::log::{Context, LogMethod, LogRouter, MetadataValue, SinkDestination};

use crate::cli::{AskArgs, Commands, ExportArgs, LogArgs};

/// Parse `key=value` pairs, inferring numbers and booleans
pub fn parse_context(entries: &[String]) -> Result<Context> {
    let mut context = Context::new();
    for entry in entries {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid context entry '{}', expected key=value", entry))?;
        context.push(key.trim(), parse_value(value.trim()));
    }
    Ok(context)
}

fn parse_value(value: &str) -> MetadataValue {
    if let Ok(v) = value.parse::<i64>() {
        return MetadataValue::I64(v);
    }
    if let Ok(v) = value.parse::<f64>() {
        return MetadataValue::F64(v);
    }
    match value {
        "true" => MetadataValue::Bool(true),
        "false" => MetadataValue::Bool(false),
        "null" => MetadataValue::Null,
        _ => MetadataValue::String(value.to_string()),
    }
}

pub async fn execute_log(args: &LogArgs, router: &LogRouter) -> Result<()> {
    let method: LogMethod = args.method.parse().map_err(|e: String| anyhow!(e))?;
    let context = parse_context(&args.context)?;

    if let Some(name) = &args.log_name {
        let aggregation = router
            .aggregation()
            .context("--log-name requires an aggregation channel")?;
        aggregation.set_log_name(name.clone()).await;
    }

    router.call(method, args.message.clone(), context).await?;
    Ok(())
}

pub async fn execute_ask(args: &AskArgs, router: &LogRouter) -> Result<()> {
    let answer = router.ask(&args.prompt).await?;
    println!("{}", answer);
    Ok(())
}

pub async fn execute_links(router: &LogRouter) -> Result<()> {
    let links = router.links().await;
    if links.is_empty() {
        println!("No channel provides a link");
        return Ok(());
    }
    for (name, link) in links {
        println!("{}\t{}", name, link);
    }
    Ok(())
}

pub async fn execute_export(args: &ExportArgs, router: &LogRouter) -> Result<()> {
    let destinations: SinkDestination = args.destination.parse()?;
    let aggregation = router
        .aggregation()
        .context("export requires an aggregation channel")?;

    let created = aggregation
        .export(destinations, &args.sink, &args.params)
        .await?;
    for sink in created {
        println!("Created sink {}", sink);
    }
    Ok(())
}

/// Run a subcommand, then flush the router even when the command failed
pub async fn execute(command: &Commands, router: &LogRouter) -> Result<()> {
    let result = match command {
        Commands::Log(args) => execute_log(args, router).await,
        Commands::Ask(args) => execute_ask(args, router).await,
        Commands::Links => execute_links(router).await,
        Commands::Export(args) => execute_export(args, router).await,
    };

    // Write out entries still buffered by batching channels
    let flushed = router.flush().await;
    result?;
    flushed?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stacklog::log::{LogChannel, LogEvent, LogLevel};
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct FlushCountingChannel {
        flushes: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl LogChannel for FlushCountingChannel {
        fn kind(&self) -> &'static str {
            "FlushCountingChannel"
        }

        fn level(&self) -> LogLevel {
            LogLevel::Debug
        }

        fn bubble(&self) -> bool {
            true
        }

        async fn handle(&self, _event: &LogEvent) -> stacklog::log::Result<bool> {
            Ok(false)
        }

        async fn flush(&self) -> stacklog::log::Result<()> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn log_command(method: &str) -> Commands {
        Commands::Log(LogArgs {
            method: method.to_string(),
            message: "disk full".to_string(),
            context: vec![],
            log_name: None,
        })
    }

    #[tokio::test]
    async fn test_execute_flushes_after_failed_command() -> Result<()> {
        let channel = Arc::new(FlushCountingChannel::default());
        let router = LogRouter::from_channels(
            "cli",
            vec![("counting".to_string(), channel.clone() as Arc<dyn LogChannel>)],
        )?;

        assert!(execute(&log_command("trace"), &router).await.is_err());
        assert_eq!(channel.flushes.load(Ordering::SeqCst), 1);

        execute(&log_command("error"), &router).await?;
        assert_eq!(channel.flushes.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[test]
    fn test_parse_context() -> Result<()> {
        let context = parse_context(&[
            "code=42".to_string(),
            "ratio=0.5".to_string(),
            "ok=true".to_string(),
            "mount=/data".to_string(),
            "expr=a=b".to_string(),
        ])?;

        assert_eq!(context.get("code"), Some(&MetadataValue::I64(42)));
        assert_eq!(context.get("ratio"), Some(&MetadataValue::F64(0.5)));
        assert_eq!(context.get("ok"), Some(&MetadataValue::Bool(true)));
        assert_eq!(
            context.get("mount"),
            Some(&MetadataValue::String("/data".to_string()))
        );
        assert_eq!(
            context.get("expr"),
            Some(&MetadataValue::String("a=b".to_string()))
        );

        assert!(parse_context(&["novalue".to_string()]).is_err());
        Ok(())
    }
}
