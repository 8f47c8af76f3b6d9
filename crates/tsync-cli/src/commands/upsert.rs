//! `tsync plan` and `tsync upsert`.

use anyhow::{Context, Result};
use tracing::warn;
use tsync_config::{report_unused_keys, LoadedConfig, SyncSettings, UnusedKeyPolicy};
use tsync_runtime::{plan_upsert, run_upsert, UpsertPlan, UpsertRequest};
use tsync_store::CsvWorkbook;

use super::join_cells;
use crate::UpsertArgs;

struct Prepared {
    loaded: LoadedConfig,
    settings: SyncSettings,
    request: UpsertRequest,
}

/// Config, overrides and upload, resolved before the workbook is touched.
fn prepare(args: &UpsertArgs) -> Result<Prepared> {
    let path_refs: Vec<&str> = args.config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = tsync_config::load_layered_yaml(&path_refs)?;

    let policy = if args.strict_config {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let report = report_unused_keys(&loaded.config_json, policy)?;
    for p in &report.unused_leaf_pointers {
        warn!(pointer = %p, "CONFIG_UNUSED_KEYS");
    }

    let mut settings = SyncSettings::from_config_json(&loaded.config_json)?;
    settings.apply_overrides(
        args.table.as_deref(),
        args.key.as_deref(),
        args.sync.as_deref(),
    );
    let table = settings.require_table()?.to_string();
    let options = settings.reconcile_options()?;

    let batch = tsync_ingest::read_records_file(&args.file)
        .with_context(|| format!("read upload {}", args.file.display()))?;

    let source_file = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());

    let log = if args.no_log {
        None
    } else {
        settings.log_target().map(str::to_string)
    };

    let request = UpsertRequest {
        table,
        source_file,
        batch,
        options,
        log,
        config_hash: Some(loaded.config_hash.clone()),
    };

    Ok(Prepared {
        loaded,
        settings,
        request,
    })
}

pub async fn plan(args: UpsertArgs) -> Result<()> {
    let p = prepare(&args)?;
    let wb = CsvWorkbook::open(&p.settings.store_root)
        .await
        .with_context(|| format!("open workbook {}", p.settings.store_root.display()))?;
    let planned = plan_upsert(&wb, &p.request).await;
    wb.close();
    let planned = planned?;

    println!("config_hash={}", p.loaded.config_hash);
    print_plan(&planned, &p.request);
    Ok(())
}

pub async fn upsert(args: UpsertArgs) -> Result<()> {
    let p = prepare(&args)?;
    let wb = CsvWorkbook::open(&p.settings.store_root)
        .await
        .with_context(|| format!("open workbook {}", p.settings.store_root.display()))?;
    let report = run_upsert(&wb, &p.request).await;
    wb.close();
    let report = report?;

    println!("config_hash={}", p.loaded.config_hash);
    print_plan(&report.plan, &p.request);
    println!("inserted={}", report.applied.inserted);
    println!("updated={}", report.applied.updated);
    println!("errors={}", report.applied.errors.len());
    for e in &report.applied.errors {
        println!("error={e}");
    }
    match (&p.request.log, &report.log_error) {
        (None, _) => println!("log_written=false"),
        (Some(_), None) => println!("log_written=true"),
        (Some(_), Some(err)) => {
            println!("log_written=false");
            println!("log_error={err}");
        }
    }
    Ok(())
}

fn print_plan(plan: &UpsertPlan, req: &UpsertRequest) {
    let out = &plan.outcome;
    println!("run_id={}", plan.run_id);
    println!("table={}", plan.table);
    println!("matching_col={}", req.options.key_column);
    println!("source_rows={}", req.batch.len());
    println!("header_bootstrap={}", plan.bootstrap_header.is_some());
    println!("planned_inserts={}", out.inserts.len());
    println!("planned_updates={}", out.updates.len());
    println!("unchanged={}", out.unchanged);
    println!("skipped_blank_keys={}", out.skipped_blank_keys);
    println!("skipped_duplicates={}", out.skipped_duplicates);
    if !out.ignored_columns.is_empty() {
        println!("ignored_columns={}", join_cells(&out.ignored_columns));
    }
    if !out.target_duplicate_keys.is_empty() {
        println!("target_duplicate_keys={}", join_cells(&out.target_duplicate_keys));
    }
    for r in &out.inserts {
        println!("insert key={}", r.key);
    }
    for u in &out.updates {
        println!(
            "update row={} key={} changed={}",
            u.row,
            u.key,
            join_cells(&u.changed_columns)
        );
    }
}
