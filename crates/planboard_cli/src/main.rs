//! CLI smoke entry point.
//!
//! # Responsibility
//! - Drive one planning session end to end against a real database.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `planboard_cli [DB_PATH] [USER_ID]`. Without a path the database
//! lives in memory. Set `PLANBOARD_LOG_DIR` to an absolute directory to get
//! rolling log files.

use log::info;
use planboard_core::db::{open_db, open_db_in_memory};
use planboard_core::{
    core_version, default_log_level, init_logging, PlanningStudio, PointerKind, PointerSample,
    SaveOutcome, Session, SqlitePlanningStore, StudioConfig, TaskFields,
};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    if let Ok(log_dir) = std::env::var("PLANBOARD_LOG_DIR") {
        init_logging(default_log_level(), &log_dir)?;
    }

    let mut args = std::env::args().skip(1);
    let conn = match args.next() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let session = Session::new(args.next().unwrap_or_else(|| "local".to_string()))?;
    let store = SqlitePlanningStore::try_new(&conn)?;

    let mut studio = PlanningStudio::open(&store, session, StudioConfig::default());
    println!("planboard_core version={}", core_version());
    println!("loaded boards={}", studio.boards().len());

    let todo = studio.add_board("To Do", "Work that has not started");
    let done = studio.add_board("Done", "Finished work");
    let task = studio
        .add_task(&todo, TaskFields::titled("Try the planning studio"))
        .ok_or("freshly added board disappeared")?;

    studio.press_task(PointerKind::Mouse, &task, PointerSample::new(0.0, 0.0, 0));
    studio.pointer_move(PointerSample::new(24.0, 0.0, 16));
    let dropped = studio.release_drag(Some(&done));
    println!("drop movement={:?}", dropped.movement);

    match studio.save() {
        SaveOutcome::Saved(receipt) => {
            info!(
                "event=cli_save module=cli status=ok boards={}",
                receipt.board_ids.len()
            );
            println!(
                "saved boards={} tasks={}",
                receipt.board_ids.len(),
                receipt.task_ids.len()
            );
        }
        SaveOutcome::Failed(err) => return Err(err.into()),
        other => println!("save outcome={other:?}"),
    }

    for board in studio.boards() {
        println!("board id={} title={:?} tasks={}", board.id, board.title, board.tasks.len());
        for task in &board.tasks {
            println!("  task id={} status={}", task.id, task.status);
        }
    }
    for notice in studio.drain_notices() {
        println!("notice level={:?} message={:?}", notice.level, notice.message);
    }
    Ok(())
}
