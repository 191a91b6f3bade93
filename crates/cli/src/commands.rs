//! Command handlers. Each returns the JSON value printed on stdout.

use anyhow::{bail, Context, Result};
use attest_ledger::{
    AccountId, Digest256, Endorsement, ExpiryCursor, Ledger, LedgerError, LedgerStore,
    Registration, SweepReport, Timestamp,
};
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a content digest
    Register {
        /// Authenticated author account
        #[arg(long)]
        author: AccountId,
        /// BLAKE3 digest of the content (64 hex chars)
        #[arg(long)]
        hash: Digest256,
        #[arg(long)]
        filename: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Endorse a registered digest
    Endorse {
        /// Authenticated endorsing account
        #[arg(long)]
        signer: AccountId,
        #[arg(long)]
        hash: Digest256,
    },
    /// Evict expired files and their endorsements
    Sweep {
        /// Maximum files to evict (defaults to `sweep_batch`)
        #[arg(long)]
        max: Option<u16>,
    },
    /// Show one file and its endorsements
    Show(ShowArgs),
    /// List files by expiry
    Expiring {
        /// Resume after this `expires:id` cursor
        #[arg(long)]
        after: Option<ExpiryCursor>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List endorsements of one file
    Endorsements {
        #[arg(long)]
        file_id: u64,
        /// Resume after this composite key
        #[arg(long)]
        after: Option<u64>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Record counts and id counters
    Stats,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct ShowArgs {
    #[arg(long)]
    hash: Option<Digest256>,
    #[arg(long)]
    id: Option<u64>,
}

/// Inputs supplied by the caller's environment rather than the command.
pub struct Invocation {
    pub now: Timestamp,
    pub sweep_batch: u16,
    pub page_limit: usize,
}

/// What a submission reference is computed over.
#[derive(Serialize)]
struct Submission<'a, T: Serialize> {
    operation: &'static str,
    request: &'a T,
    now: Timestamp,
}

/// BLAKE3 of the canonical JSON of an operation and its timestamp.
pub fn submission_ref<T: Serialize>(
    operation: &'static str,
    request: &T,
    now: Timestamp,
) -> Result<Digest256> {
    let bytes = serde_json::to_vec(&Submission {
        operation,
        request,
        now,
    })
    .context("failed to encode submission")?;
    Ok(Digest256::blake3(&bytes))
}

pub fn execute<S: LedgerStore>(
    ledger: &Ledger<S>,
    command: Commands,
    ctx: &Invocation,
) -> Result<Value> {
    match command {
        Commands::Register {
            author,
            hash,
            filename,
            description,
        } => {
            let request = Registration::new(author, hash, filename, description);
            let reference = submission_ref("register", &request, ctx.now)?;
            debug!(submission_ref = %reference, "submitting registration");
            let file = ledger
                .register(request, ctx.now, reference)
                .context("register failed")?;
            Ok(serde_json::to_value(file)?)
        }
        Commands::Endorse { signer, hash } => {
            let request = Endorsement::new(signer, hash);
            let reference = submission_ref("endorse", &request, ctx.now)?;
            debug!(submission_ref = %reference, "submitting endorsement");
            let record = ledger
                .endorse(request, ctx.now, reference)
                .context("endorse failed")?;
            Ok(serde_json::to_value(record)?)
        }
        Commands::Sweep { max } => {
            let max_count = max.unwrap_or(ctx.sweep_batch);
            let report = match ledger.sweep_expired_with_report(max_count, ctx.now) {
                Ok(report) => report,
                Err(LedgerError::NothingToDo) => SweepReport::default(),
                Err(err) => return Err(err).context("sweep failed"),
            };
            Ok(serde_json::to_value(report)?)
        }
        Commands::Show(args) => show(ledger, args, ctx),
        Commands::Expiring { after, limit } => {
            let page = ledger.files_by_expiry(after, limit.unwrap_or(ctx.page_limit))?;
            Ok(json!({
                "items": page.items,
                "next": page.next.map(|cursor| cursor.to_string()),
            }))
        }
        Commands::Endorsements {
            file_id,
            after,
            limit,
        } => {
            let page = ledger.endorsements_of(file_id, after, limit.unwrap_or(ctx.page_limit))?;
            Ok(serde_json::to_value(page)?)
        }
        Commands::Stats => Ok(serde_json::to_value(ledger.stats()?)?),
    }
}

fn show<S: LedgerStore>(ledger: &Ledger<S>, args: ShowArgs, ctx: &Invocation) -> Result<Value> {
    let file = match (args.hash, args.id) {
        (Some(hash), _) => ledger.file_by_hash(&hash)?,
        (None, Some(id)) => ledger.file(id)?,
        (None, None) => bail!("either --hash or --id is required"),
    };
    let Some(file) = file else {
        bail!("no live file matches the query");
    };

    let endorsements = ledger.endorsements_of(file.id, None, ctx.page_limit)?;
    Ok(json!({
        "file": file,
        "expired": file.is_expired(ctx.now),
        "endorsements": endorsements,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_ledger::MemoryLedgerStore;

    fn ctx(now: u64) -> Invocation {
        Invocation {
            now: Timestamp(now),
            sweep_batch: 100,
            page_limit: 50,
        }
    }

    fn account(n: u8) -> AccountId {
        AccountId([n; 32])
    }

    #[test]
    fn submission_ref_depends_on_time_and_request() {
        let request = Endorsement::new(account(1), Digest256::blake3(b"x"));
        let a = submission_ref("endorse", &request, Timestamp(1)).unwrap();
        let b = submission_ref("endorse", &request, Timestamp(1)).unwrap();
        let c = submission_ref("endorse", &request, Timestamp(2)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn register_endorse_show_flow() {
        let ledger = Ledger::new(MemoryLedgerStore::new());
        let hash = Digest256::blake3(b"report.pdf");

        let file = execute(
            &ledger,
            Commands::Register {
                author: account(1),
                hash,
                filename: "report.pdf".into(),
                description: String::new(),
            },
            &ctx(100),
        )
        .unwrap();
        assert_eq!(file["id"], 0);

        execute(
            &ledger,
            Commands::Endorse {
                signer: account(2),
                hash,
            },
            &ctx(101),
        )
        .unwrap();

        let shown = execute(
            &ledger,
            Commands::Show(ShowArgs {
                hash: Some(hash),
                id: None,
            }),
            &ctx(102),
        )
        .unwrap();
        assert_eq!(shown["expired"], false);
        assert_eq!(shown["endorsements"]["items"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn rejected_register_surfaces_error() {
        let ledger = Ledger::new(MemoryLedgerStore::new());
        let command = || Commands::Register {
            author: account(1),
            hash: Digest256::blake3(b"dup"),
            filename: "dup".into(),
            description: String::new(),
        };
        execute(&ledger, command(), &ctx(1)).unwrap();
        let err = execute(&ledger, command(), &ctx(2)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::DuplicateHash { .. })
        ));
    }

    #[test]
    fn empty_sweep_reports_nothing() {
        let ledger = Ledger::new(MemoryLedgerStore::new());
        let report = execute(&ledger, Commands::Sweep { max: None }, &ctx(5)).unwrap();
        assert_eq!(report["evicted_files"].as_array().unwrap().len(), 0);
    }
}
