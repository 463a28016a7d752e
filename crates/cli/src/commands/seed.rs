use std::sync::Arc;

use crate::commands::{build_runtime, load_config, CommandResult, StepFailure};
use storefront_core::config::{AppConfig, StorageBackend};
use storefront_core::StorageAdapter;
use storefront_db::fixtures::DemoCatalog;
use storefront_db::{connect_with_settings, migrations, DbPool, FileStorage, SqlStorage};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    if config.storage.backend == StorageBackend::Memory {
        return CommandResult::failure(
            "seed",
            "unsupported_backend",
            "memory backend does not outlive the command; choose sql or file",
            2,
        );
    }

    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let (storage, pool) = open_storage(&config).await?;

        let seeded = DemoCatalog::load(storage.as_ref())
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8));
        let verified = match seeded {
            Ok(seed_result) => DemoCatalog::verify(storage.as_ref())
                .await
                .map_err(|error| ("seed_verification", error.to_string(), 6u8))
                .map(|verification| (seed_result, verification)),
            Err(failure) => Err(failure),
        };

        if let Some(pool) = pool {
            pool.close().await;
        }

        let (seed_result, verification) = verified?;
        if !verification.all_present {
            return Err(("seed_verification", verification_message(&verification.checks), 6u8));
        }
        Ok(seed_result)
    });

    match result {
        Ok(seed_result) => CommandResult::success(
            "seed",
            format!(
                "demo catalog loaded into {} storage: {} inserted, {} already present",
                config.storage.backend.as_str(),
                seed_result.inserted.len(),
                seed_result.skipped.len()
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

async fn open_storage(
    config: &AppConfig,
) -> Result<(Arc<dyn StorageAdapter>, Option<DbPool>), StepFailure> {
    match config.storage.backend {
        StorageBackend::Sql => {
            let pool = connect_with_settings(
                &config.database.url,
                config.database.max_connections,
                config.database.timeout_secs,
            )
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
            migrations::run_pending(&pool)
                .await
                .map_err(|error| ("migration", error.to_string(), 5u8))?;
            Ok((Arc::new(SqlStorage::new(pool.clone())), Some(pool)))
        }
        StorageBackend::File => Ok((Arc::new(FileStorage::new(&config.storage.data_dir)), None)),
        StorageBackend::Memory => {
            Err(("unsupported_backend", "memory backend cannot be seeded".to_string(), 2u8))
        }
    }
}

fn verification_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for products: {}", failed_checks.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::verification_message;

    #[test]
    fn verification_error_message_targets_failed_checks() {
        let checks = [("DEMO-MATE-001", true), ("DEMO-TEA-002", false), ("DEMO-MUG-003", false)];

        assert_eq!(
            verification_message(&checks),
            "Seed verification failed for products: DEMO-TEA-002, DEMO-MUG-003"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        let checks = [("DEMO-MATE-001", true), ("DEMO-TEA-002", true)];

        assert_eq!(verification_message(&checks), "Some seed data failed to load");
    }
}
