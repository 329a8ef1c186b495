//! Subcommand handlers
//!
//! Handlers are generic over the storage bundle so the binary runs the same
//! code against the memory and postgres backends.

use crate::config::SeedPolicy;
use crate::error::CliResult;
use fedblock_policy::{BlockError, BlockingService};
use fedblock_storage::{FedblockStorage, PolicyAdmin, QueryWindow, ResolutionLog};
use fedblock_types::{ActivityId, ActorIri, PolicyRecord, Resolution};
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};

/// Arguments of `fedblock check`
#[derive(Debug, Clone)]
pub struct CheckArgs {
    pub target: String,
    pub from: Vec<String>,
    pub activity_id: String,
    pub activity_type: String,
}

/// Insert configured seed policies
pub async fn seed<S: PolicyAdmin + ?Sized>(storage: &S, seeds: &[SeedPolicy]) -> CliResult<()> {
    for seed in seeds {
        let record = seed.to_record()?;
        info!(policy_id = %record.id, order = record.order, kind = %record.kind, "Seeding policy");
        storage.create_policy(record).await?;
    }
    Ok(())
}

/// Decide one activity, printing `blocked` or `accepted`
pub async fn check<S, W>(storage: Arc<S>, args: CheckArgs, out: &mut W) -> CliResult<bool>
where
    S: FedblockStorage + 'static,
    W: Write,
{
    let from = args
        .from
        .iter()
        .map(|iri| ActorIri::parse(iri))
        .collect::<Result<Vec<_>, _>>()?;

    let service = BlockingService::new(storage);
    // Dropping the evaluation future discards its uncommitted transaction.
    let decision = tokio::select! {
        decision = service.is_blocked(
            &args.target,
            &from,
            &args.activity_id,
            &args.activity_type,
        ) => decision,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, abandoning evaluation");
            Err(BlockError::Cancelled)
        }
    }?;

    writeln!(out, "{}", if decision { "blocked" } else { "accepted" })?;
    Ok(decision)
}

/// Arguments of `fedblock policy add`
#[derive(Debug, Clone)]
pub struct AddPolicyArgs {
    pub order: i64,
    pub kind: String,
    pub subject: Option<String>,
    pub owner: Option<String>,
    pub description: Option<String>,
}

pub async fn add_policy<S, W>(storage: &S, args: AddPolicyArgs, out: &mut W) -> CliResult<PolicyRecord>
where
    S: PolicyAdmin + ?Sized,
    W: Write,
{
    let record = SeedPolicy {
        order: args.order,
        kind: args.kind,
        subject: args.subject,
        owner: args.owner,
        description: args.description,
    }
    .to_record()?;
    storage.create_policy(record.clone()).await?;
    writeln!(out, "{}", serde_json::to_string(&record)?)?;
    Ok(record)
}

pub async fn list_policies<S, W>(storage: &S, out: &mut W) -> CliResult<usize>
where
    S: PolicyAdmin + ?Sized,
    W: Write,
{
    let records = storage.list_policies(QueryWindow::default()).await?;
    for record in &records {
        writeln!(out, "{}", serde_json::to_string(record)?)?;
    }
    Ok(records.len())
}

/// Print resolutions as JSON lines, for one activity or newest-first overall
pub async fn list_resolutions<S, W>(
    storage: &S,
    activity_id: Option<&str>,
    limit: usize,
    out: &mut W,
) -> CliResult<usize>
where
    S: ResolutionLog + ?Sized,
    W: Write,
{
    let resolutions: Vec<Resolution> = match activity_id {
        Some(id) => {
            let id = ActivityId::parse(id)?;
            storage.resolutions_for_activity(&id).await?
        }
        None => {
            storage
                .list_resolutions(QueryWindow { limit, offset: 0 })
                .await?
        }
    };
    for resolution in &resolutions {
        writeln!(out, "{}", serde_json::to_string(resolution)?)?;
    }
    Ok(resolutions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedblock_storage::InMemoryStorage;

    fn seeds() -> Vec<SeedPolicy> {
        vec![
            SeedPolicy {
                order: 0,
                kind: "instance_deny".into(),
                subject: Some("bad.example".into()),
                owner: None,
                description: None,
            },
            SeedPolicy {
                order: 1,
                kind: "always_grant".into(),
                subject: None,
                owner: None,
                description: Some("default accept".into()),
            },
        ]
    }

    fn check_args(from: &str) -> CheckArgs {
        CheckArgs {
            target: "alice".into(),
            from: vec![from.into()],
            activity_id: "https://remote.example/activities/1".into(),
            activity_type: "Follow".into(),
        }
    }

    #[tokio::test]
    async fn test_check_prints_decision() {
        let storage = Arc::new(InMemoryStorage::new());
        seed(storage.as_ref(), &seeds()).await.unwrap();

        let mut out = Vec::new();
        let blocked = check(
            Arc::clone(&storage),
            check_args("https://bad.example/users/m"),
            &mut out,
        )
        .await
        .unwrap();
        assert!(blocked);
        assert_eq!(String::from_utf8(out).unwrap(), "blocked\n");

        let mut out = Vec::new();
        let blocked = check(storage, check_args("https://ok.example/users/o"), &mut out)
            .await
            .unwrap();
        assert!(!blocked);
        assert_eq!(String::from_utf8(out).unwrap(), "accepted\n");
    }

    #[tokio::test]
    async fn test_check_without_policies_fails_closed() {
        let storage = Arc::new(InMemoryStorage::new());
        let mut out = Vec::new();

        let err = check(storage, check_args("https://ok.example/users/o"), &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, crate::error::CliError::Block(_)));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_add_and_list_policies() {
        let storage = InMemoryStorage::new();
        let mut out = Vec::new();
        add_policy(
            &storage,
            AddPolicyArgs {
                order: 3,
                kind: "actor_deny".into(),
                subject: Some("https://bad.example/users/m".into()),
                owner: Some("alice".into()),
                description: None,
            },
            &mut out,
        )
        .await
        .unwrap();

        let mut out = Vec::new();
        assert_eq!(list_policies(&storage, &mut out).await.unwrap(), 1);
        let line = String::from_utf8(out).unwrap();
        let record: PolicyRecord = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(record.owner_id.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_resolutions_as_json_lines() {
        let storage = Arc::new(InMemoryStorage::new());
        seed(storage.as_ref(), &seeds()).await.unwrap();
        check(
            Arc::clone(&storage),
            check_args("https://ok.example/users/o"),
            &mut Vec::<u8>::new(),
        )
        .await
        .unwrap();

        let mut out = Vec::new();
        let count = list_resolutions(
            storage.as_ref(),
            Some("https://remote.example/activities/1"),
            0,
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(count, 2);
        let lines = String::from_utf8(out).unwrap();
        let parsed = lines
            .lines()
            .map(|line| serde_json::from_str::<Resolution>(line).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(parsed[0].order, 0);
        assert_eq!(parsed[1].order, 1);
    }
}
