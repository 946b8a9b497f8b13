use std::collections::VecDeque;
use std::path::PathBuf;

use serde::Serialize;
use sqlx::SqlitePool;

use content_compliance::crypto::hash_file;
use content_compliance::domain::{ChatFlag, FormMetadata, SentimentRecord, VaultRecord};
use content_compliance::infra::{
    sqlite, AuditQueryFilters, SqliteAuditLog, SqliteChatFlags, SqliteEscalationStore,
    SqliteHashRegistry, SqliteSentimentLog, SqliteVault,
};
use content_compliance::telemetry::{init_tracing, TelemetryConfig};
use content_compliance::{AuditEventKind, ComplianceService, Config};

fn print_help() {
    eprintln!(
        "\
compliance-admin

USAGE:
  compliance-admin <command> [options]

COMMANDS:
  migrate                         Run database migrations
  check-dmca                      Run the DMCA check on a file and store the report
  validate-consent                Validate a consent document and store the log
  escalate                        Escalate new flags into the review queue
  list-dmca                       List recent DMCA reports
  list-consent                    List recent consent logs
  list-escalations                List recent escalations
  list-audit                      List recent audit events
  register-hash                   Add a digest to the known-infringement registry
  put-vault-record                Store a release record for a subject
  record-sentiment                Append a sentiment score
  flag-chat                       Append a flagged chat message

COMMON OPTIONS:
  --database-url <sqlite_url>     (defaults to env DATABASE_URL)

check-dmca OPTIONS:
  --file <path>                   (required)
  --uploader-id <id>              (required)

validate-consent OPTIONS:
  --document <path>               (required)
  --subject-id <id>               (required)

escalate OPTIONS:
  --window <n>                    (default: env ESCALATION_WINDOW or 10)

list-dmca / list-consent / list-escalations OPTIONS:
  --limit <n>                     (default: 20)

list-audit OPTIONS:
  --event <name>                  (optional) e.g. dmca_violation_detected
  --limit <n>                     (default: 20)

register-hash OPTIONS:
  --digest <hex>                  (one of --digest / --file)
  --file <path>                   Hash this file and register the digest
  --label <text>                  (optional)

put-vault-record OPTIONS:
  --subject-id <id>               (required)
  --form <path>                   (required) Signed form text to take metadata from

record-sentiment OPTIONS:
  --polarity <f64>                (required) -1.0 to 1.0
  --subjectivity <f64>            (default: 0.5)

flag-chat OPTIONS:
  --message-id <id>               (required)
  --user-id <id>                  (required)
  --details <text>                (required)

ENV:
  DATABASE_URL, MAX_DB_CONNECTIONS, CONSENT_MIN_TEXT_LENGTH,
  COLLABORATOR_TIMEOUT_MS, ESCALATION_WINDOW, VIOLENCE_KEYWORDS,
  LOG_LEVEL / RUST_LOG, LOG_JSON
"
    );
}

fn next_value(args: &mut VecDeque<String>, flag: &str) -> anyhow::Result<String> {
    args.pop_front()
        .ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))
}

fn required<T>(value: Option<T>, flag: &str) -> anyhow::Result<T> {
    value.ok_or_else(|| anyhow::anyhow!("{flag} is required"))
}

async fn open(config: &Config) -> anyhow::Result<SqlitePool> {
    let pool = sqlite::connect(&config.database_url, config.max_connections).await?;
    sqlite::initialize(&pool).await?;
    Ok(pool)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Pull `--database-url` and `--limit` out of the remaining arguments
fn common_limit(
    args: &mut VecDeque<String>,
    config: &mut Config,
) -> anyhow::Result<Option<u32>> {
    let mut limit = None;
    while let Some(arg) = args.pop_front() {
        match arg.as_str() {
            "--database-url" => {
                config.database_url = next_value(args, "--database-url")?;
            }
            "--limit" => {
                limit = Some(next_value(args, "--limit")?.parse()?);
            }
            other => anyhow::bail!("unexpected argument: {other}"),
        }
    }
    Ok(limit)
}

const DEFAULT_LIST_LIMIT: u32 = 20;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args: VecDeque<String> = std::env::args().skip(1).collect();
    let Some(command) = args.pop_front() else {
        print_help();
        return Ok(());
    };

    if matches!(command.as_str(), "-h" | "--help" | "help") || args.iter().any(|a| a == "-h" || a == "--help") {
        print_help();
        return Ok(());
    }

    init_tracing(&TelemetryConfig::from_env())?;
    let mut config = Config::from_env();

    match command.as_str() {
        "migrate" => {
            common_limit(&mut args, &mut config)?;
            open(&config).await?;
            println!("ok: migrations applied");
            Ok(())
        }
        "check-dmca" => {
            let mut file: Option<PathBuf> = None;
            let mut uploader_id: Option<String> = None;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => config.database_url = next_value(&mut args, "--database-url")?,
                    "--file" => file = Some(next_value(&mut args, "--file")?.into()),
                    "--uploader-id" => uploader_id = Some(next_value(&mut args, "--uploader-id")?),
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }
            let file = required(file, "--file")?;
            let uploader_id = required(uploader_id, "--uploader-id")?;

            let service = ComplianceService::sqlite(open(&config).await?, &config);
            let verdict = service.check_dmca(&file, &uploader_id).await?;
            print_json(&verdict)
        }
        "validate-consent" => {
            let mut document: Option<PathBuf> = None;
            let mut subject_id: Option<String> = None;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => config.database_url = next_value(&mut args, "--database-url")?,
                    "--document" => document = Some(next_value(&mut args, "--document")?.into()),
                    "--subject-id" => subject_id = Some(next_value(&mut args, "--subject-id")?),
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }
            let document = required(document, "--document")?;
            let subject_id = required(subject_id, "--subject-id")?;

            let service = ComplianceService::sqlite(open(&config).await?, &config);
            let verdict = service.validate_consent(&document, &subject_id).await?;
            print_json(&verdict)
        }
        "escalate" => {
            let mut window = config.escalation_window;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => config.database_url = next_value(&mut args, "--database-url")?,
                    "--window" => window = next_value(&mut args, "--window")?.parse()?,
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let service = ComplianceService::sqlite(open(&config).await?, &config);
            let entries = service.run_escalation(window).await?;
            print_json(&entries)
        }
        "list-dmca" => {
            let limit = common_limit(&mut args, &mut config)?.unwrap_or(DEFAULT_LIST_LIMIT);
            let service = ComplianceService::sqlite(open(&config).await?, &config);
            print_json(&service.recent_dmca_reports(limit).await?)
        }
        "list-consent" => {
            let limit = common_limit(&mut args, &mut config)?.unwrap_or(DEFAULT_LIST_LIMIT);
            let service = ComplianceService::sqlite(open(&config).await?, &config);
            print_json(&service.recent_consent_logs(limit).await?)
        }
        "list-escalations" => {
            let limit = common_limit(&mut args, &mut config)?.unwrap_or(DEFAULT_LIST_LIMIT);
            let store = SqliteEscalationStore::new(open(&config).await?);
            print_json(&store.recent(limit).await?)
        }
        "list-audit" => {
            let mut event: Option<AuditEventKind> = None;
            let mut limit = DEFAULT_LIST_LIMIT;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => config.database_url = next_value(&mut args, "--database-url")?,
                    "--event" => event = Some(AuditEventKind::parse(&next_value(&mut args, "--event")?)),
                    "--limit" => limit = next_value(&mut args, "--limit")?.parse()?,
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let audit = SqliteAuditLog::new(open(&config).await?);
            let filters = AuditQueryFilters {
                event_name: event,
                ..Default::default()
            };
            print_json(&audit.list(filters, i64::from(limit)).await?)
        }
        "register-hash" => {
            let mut digest: Option<String> = None;
            let mut file: Option<PathBuf> = None;
            let mut label: Option<String> = None;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => config.database_url = next_value(&mut args, "--database-url")?,
                    "--digest" => digest = Some(next_value(&mut args, "--digest")?),
                    "--file" => file = Some(next_value(&mut args, "--file")?.into()),
                    "--label" => label = Some(next_value(&mut args, "--label")?),
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let digest = match (digest, file) {
                (Some(digest), None) => digest,
                (None, Some(file)) => hash_file(&file).await?,
                _ => anyhow::bail!("exactly one of --digest or --file is required"),
            };

            let registry = SqliteHashRegistry::new(open(&config).await?);
            registry.register_hash(&digest, label.as_deref()).await?;
            println!("ok: registered {digest}");
            Ok(())
        }
        "put-vault-record" => {
            let mut subject_id: Option<String> = None;
            let mut form: Option<PathBuf> = None;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => config.database_url = next_value(&mut args, "--database-url")?,
                    "--subject-id" => subject_id = Some(next_value(&mut args, "--subject-id")?),
                    "--form" => form = Some(next_value(&mut args, "--form")?.into()),
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }
            let subject_id = required(subject_id, "--subject-id")?;
            let form = required(form, "--form")?;

            let text = tokio::fs::read_to_string(&form).await?;
            let metadata = FormMetadata::extract(&text);
            if !metadata.is_complete() {
                anyhow::bail!("form is missing name, date of birth or signature");
            }

            let vault = SqliteVault::new(open(&config).await?);
            let record = VaultRecord::from_metadata(subject_id, &metadata);
            vault.put_record(&record).await?;
            print_json(&record)
        }
        "record-sentiment" => {
            let mut polarity: Option<f64> = None;
            let mut subjectivity = 0.5;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => config.database_url = next_value(&mut args, "--database-url")?,
                    "--polarity" => polarity = Some(next_value(&mut args, "--polarity")?.parse()?),
                    "--subjectivity" => subjectivity = next_value(&mut args, "--subjectivity")?.parse()?,
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }
            let polarity: f64 = required(polarity, "--polarity")?;
            if !(-1.0..=1.0).contains(&polarity) {
                anyhow::bail!("--polarity must be between -1.0 and 1.0");
            }

            let log = SqliteSentimentLog::new(open(&config).await?);
            let record = SentimentRecord::from_scores(polarity, subjectivity);
            let id = log.append(&record).await?;
            println!("ok: sentiment record {id} ({})", record.classification.as_str());
            Ok(())
        }
        "flag-chat" => {
            let mut message_id: Option<String> = None;
            let mut user_id: Option<String> = None;
            let mut details: Option<String> = None;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => config.database_url = next_value(&mut args, "--database-url")?,
                    "--message-id" => message_id = Some(next_value(&mut args, "--message-id")?),
                    "--user-id" => user_id = Some(next_value(&mut args, "--user-id")?),
                    "--details" => details = Some(next_value(&mut args, "--details")?),
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }
            let flag = ChatFlag::new(
                required(message_id, "--message-id")?,
                required(user_id, "--user-id")?,
                required(details, "--details")?,
            );

            let chat = SqliteChatFlags::new(open(&config).await?);
            let id = chat.append(&flag).await?;
            println!("ok: chat flag {id}");
            Ok(())
        }
        other => {
            print_help();
            anyhow::bail!("unknown command: {other}")
        }
    }
}
