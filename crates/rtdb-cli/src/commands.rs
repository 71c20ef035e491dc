use std::path::Path as FsPath;

use anyhow::{bail, Context};
use colored::Colorize;
use rtdb_client::{Client, ClientConfig, Credentials, ETag, QueryBuilder, Ref, TxnOutcome, Value};
use serde_json::json;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli.config.as_deref(), cli.url.as_deref(), cli.token.as_deref())?;
    tracing::debug!(url = %config.database_url, "resolved client configuration");
    let client = Client::new(config).context("failed to create client")?;
    execute(&client, cli.command, cli.format).await
}

/// Build the client configuration: the file first, then flags and
/// environment on top.
pub fn resolve_config(
    file: Option<&FsPath>,
    url: Option<&str>,
    token: Option<&str>,
) -> anyhow::Result<ClientConfig> {
    let mut config = match (file, url) {
        (Some(file), _) => ClientConfig::load(file)?,
        (None, Some(url)) => ClientConfig::new(url),
        (None, None) => {
            bail!("no database url: pass --url, set RTDB_DATABASE_URL, or use --config")
        }
    };
    if let (Some(_), Some(url)) = (file, url) {
        config.database_url = url.to_string();
    }
    if let Some(token) = token {
        config.credentials = Credentials::AccessToken(token.to_string());
    }
    Ok(config)
}

pub async fn execute(
    client: &Client,
    command: Command,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match command {
        Command::Get(args) => cmd_get(client, args, format).await,
        Command::Set(args) => cmd_set(client, args, format).await,
        Command::Update(args) => cmd_update(client, args, format).await,
        Command::Push(args) => cmd_push(client, args, format).await,
        Command::Delete(args) => cmd_delete(client, args, format).await,
        Command::Query(args) => cmd_query(client, args, format).await,
        Command::Incr(args) => cmd_incr(client, args, format).await,
    }
}

fn parse_json(raw: &str, what: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("{what} is not valid JSON: {raw}"))
}

fn print_value(value: &Value, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Json => println!("{value}"),
    }
    Ok(())
}

fn done(format: OutputFormat, message: String, summary: Value) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => println!("{} {}", "✓".green().bold(), message),
        OutputFormat::Json => println!("{summary}"),
    }
    Ok(())
}

async fn cmd_get(client: &Client, args: GetArgs, format: OutputFormat) -> anyhow::Result<()> {
    let r = client.new_ref(&args.path)?;
    if args.etag {
        let (value, etag): (Value, ETag) = r.get_with_etag().await?;
        return match format {
            OutputFormat::Text => {
                print_value(&value, format)?;
                println!("{} {}", "ETag:".dimmed(), etag.as_str().yellow());
                Ok(())
            }
            OutputFormat::Json => print_value(&json!({"value": value, "etag": etag}), format),
        };
    }
    let value = if args.shallow { r.get_shallow().await? } else { r.get::<Value>().await? };
    print_value(&value, format)
}

async fn cmd_set(client: &Client, args: SetArgs, format: OutputFormat) -> anyhow::Result<()> {
    let r = client.new_ref(&args.path)?;
    let value = parse_json(&args.value, "value")?;
    match args.if_match {
        Some(etag) => {
            if !r.set_if_unchanged(&ETag::new(etag.clone()), &value).await? {
                bail!("{} changed since version {etag}; nothing written", r.path());
            }
        }
        None => r.set(&value).await?,
    }
    done(
        format,
        format!("Set {}", r.path().to_string().bold()),
        json!({"path": r.path().to_string()}),
    )
}

async fn cmd_update(client: &Client, args: UpdateArgs, format: OutputFormat) -> anyhow::Result<()> {
    let r = client.new_ref(&args.path)?;
    let patch = match parse_json(&args.patch, "patch")? {
        Value::Object(patch) => patch,
        other => bail!("patch must be a JSON object, got {other}"),
    };
    r.update(&patch).await?;
    let noun = if patch.len() == 1 { "child" } else { "children" };
    done(
        format,
        format!("Updated {} {noun} under {}", patch.len(), r.path().to_string().bold()),
        json!({"path": r.path().to_string(), "children": patch.len()}),
    )
}

async fn cmd_push(client: &Client, args: PushArgs, format: OutputFormat) -> anyhow::Result<()> {
    let r = client.new_ref(&args.path)?;
    let value = match &args.value {
        Some(raw) => parse_json(raw, "value")?,
        None => Value::Null,
    };
    let child = r.push(&value).await?;
    done(
        format,
        format!("Pushed {}", child.path().to_string().cyan()),
        json!({"path": child.path().to_string(), "key": child.key()}),
    )
}

async fn cmd_delete(client: &Client, args: DeleteArgs, format: OutputFormat) -> anyhow::Result<()> {
    let r = client.new_ref(&args.path)?;
    r.delete().await?;
    done(
        format,
        format!("Deleted {}", r.path().to_string().bold()),
        json!({"path": r.path().to_string()}),
    )
}

fn build_query(r: &Ref, args: &QueryArgs) -> anyhow::Result<QueryBuilder> {
    let mut builder = match (&args.by_child, args.by_value) {
        (Some(child), _) => r.order_by_child(child),
        (None, true) => r.order_by_value(),
        (None, false) => r.order_by_key(),
    };
    if let Some(n) = args.first {
        builder = builder.limit_to_first(n);
    }
    if let Some(n) = args.last {
        builder = builder.limit_to_last(n);
    }
    if let Some(raw) = &args.start_at {
        builder = builder.start_at(parse_json(raw, "--start-at")?);
    }
    if let Some(raw) = &args.end_at {
        builder = builder.end_at(parse_json(raw, "--end-at")?);
    }
    if let Some(raw) = &args.equal_to {
        builder = builder.equal_to(parse_json(raw, "--equal-to")?);
    }
    Ok(builder)
}

async fn cmd_query(client: &Client, args: QueryArgs, format: OutputFormat) -> anyhow::Result<()> {
    let r = client.new_ref(&args.path)?;
    let query = build_query(&r, &args)?.build()?;
    let nodes = query.get_ordered().await?;
    match format {
        OutputFormat::Text => {
            if nodes.is_empty() {
                println!("{}", "No results.".dimmed());
            }
            for node in &nodes {
                println!("{}: {}", node.key.yellow(), node.value);
            }
        }
        OutputFormat::Json => {
            let rows: Vec<Value> = nodes
                .into_iter()
                .map(|node| json!({"key": node.key, "value": node.value}))
                .collect();
            println!("{}", Value::Array(rows));
        }
    }
    Ok(())
}

/// `current + by`, keeping integers integral. A missing value counts as 0.
fn increment(current: &Value, by: f64) -> Option<Value> {
    let base = match current {
        Value::Null => 0.0,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    let sum = base + by;
    if sum.fract() == 0.0 && sum.abs() < i64::MAX as f64 {
        Some(json!(sum as i64))
    } else {
        Some(json!(sum))
    }
}

async fn cmd_incr(client: &Client, args: IncrArgs, format: OutputFormat) -> anyhow::Result<()> {
    let r = client.new_ref(&args.path)?;
    let committed = r
        .transaction(|current| match increment(&current, args.by) {
            Some(next) => TxnOutcome::Commit(next),
            None => TxnOutcome::Abort(format!("value is not a number: {current}")),
        })
        .await?;
    done(
        format,
        format!("{} = {}", r.path().to_string().bold(), committed.to_string().cyan()),
        json!({"path": r.path().to_string(), "value": committed}),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtdb_client::{MemoryTransport, Path};
    use std::sync::Arc;

    fn memory_client() -> (Arc<MemoryTransport>, Client) {
        let transport = Arc::new(MemoryTransport::new());
        (transport.clone(), Client::with_transport(transport))
    }

    fn parse(args: &[&str]) -> Cli {
        use clap::Parser;
        Cli::try_parse_from(args).unwrap()
    }

    fn path(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn config_needs_a_url() {
        assert!(resolve_config(None, None, None).is_err());
        let c = resolve_config(None, Some("https://db.example.com"), Some("tok")).unwrap();
        assert_eq!(c.database_url, "https://db.example.com");
        assert_eq!(c.credentials, Credentials::AccessToken("tok".into()));
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("rtdb.toml");
        std::fs::write(
            &file,
            "database_url = \"https://file.example.com\"\nmax_transaction_attempts = 4\n",
        )
        .unwrap();

        let c = resolve_config(Some(file.as_path()), None, None).unwrap();
        assert_eq!(c.database_url, "https://file.example.com");
        assert_eq!(c.max_transaction_attempts, 4);

        let flag = Some("https://flag.example.com");
        let c = resolve_config(Some(file.as_path()), flag, None).unwrap();
        assert_eq!(c.database_url, "https://flag.example.com");
        assert_eq!(c.max_transaction_attempts, 4);
    }

    #[test]
    fn increment_values() {
        assert_eq!(increment(&Value::Null, 1.0), Some(json!(1)));
        assert_eq!(increment(&json!(41), 1.0), Some(json!(42)));
        assert_eq!(increment(&json!(1.5), 1.0), Some(json!(2.5)));
        assert_eq!(increment(&json!("x"), 1.0), None);
    }

    #[tokio::test]
    async fn write_commands_change_the_tree() {
        let (transport, client) = memory_client();

        let cli = parse(&["rtdb", "set", "users/alice", r#"{"name":"Alice","since":1900}"#]);
        execute(&client, cli.command, cli.format).await.unwrap();
        assert_eq!(transport.value_at(&path("users/alice/since")), json!(1900));

        let cli = parse(&["rtdb", "update", "users", r#"{"alice/since":1905}"#]);
        execute(&client, cli.command, cli.format).await.unwrap();
        assert_eq!(transport.value_at(&path("users/alice/since")), json!(1905));

        let cli = parse(&["rtdb", "push", "log", "\"hello\"", "--format", "json"]);
        execute(&client, cli.command, cli.format).await.unwrap();
        let log = transport.value_at(&path("log"));
        assert_eq!(log.as_object().map(|m| m.len()), Some(1));

        let cli = parse(&["rtdb", "delete", "users/alice"]);
        execute(&client, cli.command, cli.format).await.unwrap();
        assert_eq!(transport.value_at(&path("users")), Value::Null);
    }

    #[tokio::test]
    async fn stale_if_match_fails() {
        let (transport, client) = memory_client();
        transport.put(&path("a"), json!(1));
        let cli = parse(&["rtdb", "set", "a", "2", "--if-match", "stale"]);
        assert!(execute(&client, cli.command, cli.format).await.is_err());
        assert_eq!(transport.value_at(&path("a")), json!(1));

        let etag = transport.etag_at(&path("a"));
        let cli = parse(&["rtdb", "set", "a", "2", "--if-match", etag.as_str()]);
        execute(&client, cli.command, cli.format).await.unwrap();
        assert_eq!(transport.value_at(&path("a")), json!(2));
    }

    #[tokio::test]
    async fn incr_runs_a_transaction() {
        let (transport, client) = memory_client();
        for _ in 0..3 {
            let cli = parse(&["rtdb", "incr", "count", "--by", "2"]);
            execute(&client, cli.command, cli.format).await.unwrap();
        }
        assert_eq!(transport.value_at(&path("count")), json!(6));

        transport.put(&path("count"), json!("text"));
        let cli = parse(&["rtdb", "incr", "count"]);
        assert!(execute(&client, cli.command, cli.format).await.is_err());
    }

    #[tokio::test]
    async fn read_commands_succeed() {
        let (transport, client) = memory_client();
        transport.put(&path("scores"), json!({"a": 3, "b": 1, "c": 2}));
        for args in [
            vec!["rtdb", "get", "scores"],
            vec!["rtdb", "get", "scores", "--etag", "--format", "json"],
            vec!["rtdb", "get", "/", "--shallow"],
            vec!["rtdb", "query", "scores", "--by-value", "--first", "2"],
            vec!["rtdb", "query", "scores", "--by-key", "--start-at", "\"b\""],
        ] {
            let cli = parse(&args);
            execute(&client, cli.command, cli.format).await.unwrap();
        }
    }

    #[tokio::test]
    async fn invalid_query_is_reported() {
        let (_transport, client) = memory_client();
        let cli = parse(&["rtdb", "query", "scores", "--by-key", "--start-at", "1"]);
        assert!(execute(&client, cli.command, cli.format).await.is_err());
    }
}
