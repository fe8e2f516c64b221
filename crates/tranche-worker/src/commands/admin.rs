//! `tranche admin` command implementation
//!
//! Thin wrappers over the server's administrative endpoints.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use std::path::Path;

use crate::api::{ApiClient, CreateUserRequest, UpdateUserRequest, UploadDatasetRequest, User};
use crate::config::Config;
use crate::error::{Result, WorkerError};
use crate::progress::create_spinner;
use crate::remote::RemoteStore;
use crate::tabular;
use crate::{AdminCommand, UserCommand};

pub async fn run(config: &Config, command: AdminCommand) -> Result<()> {
    let client = ApiClient::new(&config.server_url)?;

    match command {
        AdminCommand::Upload { file, region, name } => upload(&client, &file, &region, name).await,
        AdminCommand::Datasets { region } => datasets(&client, &region).await,
        AdminCommand::DeleteDataset { region, id } => {
            client.delete_dataset(&region, &id).await?;
            println!("{} Dataset {} deleted", "✓".green(), id);
            Ok(())
        },
        AdminCommand::Export { region, output } => export(&client, &region, &output).await,
        AdminCommand::ResetProgress {
            worker_id,
            sub_region,
        } => {
            let r = client.reset_progress(&worker_id, &sub_region).await?;
            println!(
                "{} Bundle {} of '{}' reset for {}: {} record(s) deleted, number {}",
                "✓".green(),
                r.bundle_number,
                r.sub_region,
                r.worker_id,
                r.deleted_records,
                if r.recycled { "recycled" } else { "not recycled" }
            );
            Ok(())
        },
        AdminCommand::ForceComplete {
            worker_id,
            sub_region,
        } => {
            let r = client.force_complete(&worker_id, &sub_region).await?;
            println!(
                "{} Bundle {} of '{}' marked complete",
                "✓".green(),
                r.bundle_number,
                r.sub_region
            );
            Ok(())
        },
        AdminCommand::ManualAssign {
            worker_id,
            sub_region,
            bundle_number,
        } => {
            if bundle_number == 0 {
                return Err(WorkerError::config("bundle number must be greater than 0"));
            }
            let r = client
                .manual_assign(&worker_id, &sub_region, bundle_number)
                .await?;
            println!(
                "{} Bundle {} of '{}' assigned to {}",
                "✓".green(),
                r.active_bundle.bundle_number,
                r.active_bundle.sub_region,
                r.worker_id
            );
            Ok(())
        },
        AdminCommand::Release {
            worker_id,
            sub_region,
        } => {
            let r = client.release(&worker_id, &sub_region).await?;
            println!(
                "{} Bundle {} of '{}' released from {}",
                "✓".green(),
                r.bundle_number,
                r.sub_region,
                r.worker_id
            );
            Ok(())
        },
        AdminCommand::PurgeRecords { password } => {
            let r = client.purge_processed_records(&password).await?;
            println!(
                "{} Deleted {} record(s) and {} bundle flag(s)",
                "✓".green(),
                r.deleted_records,
                r.deleted_flags
            );
            Ok(())
        },
        AdminCommand::ResetCounters { password } => {
            let r = client.reset_counters(&password).await?;
            println!(
                "{} Deleted {} counter(s) and {} active bundle(s)",
                "✓".green(),
                r.deleted_counters,
                r.deleted_active_bundles
            );
            Ok(())
        },
        AdminCommand::Counters { region } => counters(&client, region.as_deref()).await,
        AdminCommand::Users { command } => users(&client, command).await,
        AdminCommand::Summary { region } => summary(&client, region.as_deref()).await,
    }
}

async fn upload(client: &ApiClient, file: &Path, region: &str, name: Option<String>) -> Result<()> {
    let name = match name {
        Some(n) => n,
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| WorkerError::config(format!("'{}' has no file name", file.display())))?,
    };
    let rows = tabular::read_file(file)?;
    if rows.is_empty() {
        return Err(WorkerError::NoRecords(format!("'{}' has no data rows", file.display())));
    }
    let size_bytes = std::fs::metadata(file).ok().map(|m| m.len() as i64);

    let spinner = create_spinner(&format!("Uploading {} rows", rows.len()));
    let request = UploadDatasetRequest {
        name,
        size_bytes,
        rows,
    };
    let result = client.upload_dataset(region, &request).await;
    spinner.finish_and_clear();
    let summary = result?;

    println!(
        "{} Uploaded '{}' to {} ({} records)",
        "✓".green(),
        summary.name.cyan(),
        summary.region,
        summary.record_count
    );
    Ok(())
}

async fn datasets(client: &ApiClient, region: &str) -> Result<()> {
    let datasets = client.list_datasets(region).await?;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Id", "Name", "Records", "Size", "Uploaded"]);
    for d in datasets {
        table.add_row(vec![
            d.id,
            d.name,
            d.record_count.to_string(),
            d.size_bytes.to_string(),
            d.uploaded_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn export(client: &ApiClient, region: &str, output: &Path) -> Result<()> {
    let records = client.export_records(region).await?;
    tabular::write_export_file(&records, output)?;
    println!(
        "{} Exported {} record(s) to {}",
        "✓".green(),
        records.len(),
        output.display()
    );
    Ok(())
}

async fn counters(client: &ApiClient, region: Option<&str>) -> Result<()> {
    let counters = client.counters(region).await?;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Region", "Sub-region", "Next", "Gaps", "Next to assign"]);
    for c in counters {
        let gaps = c
            .gaps
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            c.region,
            c.sub_region,
            c.next_bundle_number.to_string(),
            gaps,
            c.next_to_assign.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn print_users(users: &[User]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Id", "Name", "Username", "Mobile", "Region", "Dataset"]);
    for u in users {
        table.add_row(vec![
            u.id.clone(),
            u.name.clone(),
            u.username.clone(),
            u.mobile.clone(),
            u.region.clone(),
            u.dataset_name.clone().unwrap_or_default(),
        ]);
    }
    println!("{table}");
}

async fn users(client: &ApiClient, command: UserCommand) -> Result<()> {
    match command {
        UserCommand::List { region } => {
            print_users(&client.list_users(region.as_deref()).await?);
        },
        UserCommand::Get { id } => {
            let user = client.get_user(&id).await?;
            let state = client.active_bundles(&user.id).await?;
            print_users(std::slice::from_ref(&user));
            for bundle in state.values() {
                println!(
                    "  {} bundle {} ({}/{})",
                    bundle.sub_region,
                    bundle.bundle_number,
                    bundle.count,
                    tranche_common::BUNDLE_CAPACITY
                );
            }
        },
        UserCommand::Create {
            id,
            name,
            username,
            mobile,
            region,
            dataset,
        } => {
            let request = CreateUserRequest {
                id,
                name,
                username,
                mobile,
                region,
                dataset_name: dataset,
            };
            let user = client.create_user(&request).await?;
            println!("{} Created user {} ({})", "✓".green(), user.username, user.id);
        },
        UserCommand::Update {
            id,
            name,
            username,
            mobile,
            region,
            dataset,
        } => {
            let request = UpdateUserRequest {
                name,
                username,
                mobile,
                region,
                dataset_name: dataset,
            };
            let user = client.update_user(&id, &request).await?;
            println!("{} Updated user {}", "✓".green(), user.username);
        },
        UserCommand::Delete { id } => {
            let deleted = client.delete_user(&id).await?;
            println!("{} Deleted user {}", "✓".green(), deleted.id);
        },
    }
    Ok(())
}

async fn summary(client: &ApiClient, region: Option<&str>) -> Result<()> {
    let summary = client.summary(region).await?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Region", "Dataset", "Processed", "Total"]);
    for d in &summary.datasets {
        table.add_row(vec![
            d.region.clone(),
            d.name.clone(),
            d.processed_records.to_string(),
            d.total_records.to_string(),
        ]);
    }
    println!("{table}");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Region", "Sub-region", "Bundle", "Records", "Complete"]);
    for b in &summary.bundles {
        let complete = match (b.is_complete, b.is_force_completed) {
            (_, true) => "forced".to_string(),
            (true, false) => "yes".to_string(),
            (false, false) => "no".to_string(),
        };
        table.add_row(vec![
            b.region.clone(),
            b.sub_region.clone(),
            b.bundle_number.to_string(),
            b.record_count.to_string(),
            complete,
        ]);
    }
    println!("{table}");
    println!(
        "{} processed, {} bundle(s) complete",
        summary.total_processed, summary.completed_bundles
    );
    Ok(())
}
