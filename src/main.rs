mod cli;

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::Receiver;

use crate::cli::{
    BackendArg, CategoryArg, Cli, Command, ExportArgs, IdeaAdd, IdeaCommand, IdeaList, IdeaRemove,
    IdeaShow, IdeaStatus, IdeaUpdate, ImportArgs, StatusArg, TaskAdd, TaskCommand, TaskList,
    TaskRef, TaskUpdate,
};
use ideastack::db;
use ideastack::error::AppError;
use ideastack::events::{ChangeOrigin, NoticeLevel, StoreEvent};
use ideastack::model::{Category, IdeaInput, Status, Task, TaskFilter};
use ideastack::storage::{AnyStorage, FileStorage, SqliteStorage};
use ideastack::store::Store;
use ideastack::util::{
    format_idea_detail, format_idea_line, format_task_groups, parse_due_date, EXPORT_FILE_NAME,
};

type AppStore = Store<AnyStorage>;

#[tokio::main]
async fn main() {
    ideastack::logging::init_logging();
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let Cli {
        data_dir,
        backend,
        command,
    } = Cli::parse();

    let data_dir = db::resolve_data_dir(data_dir).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "unable to resolve data directory; pass --data-dir or set {}",
            db::DATA_DIR_ENV
        ))
    })?;
    let storage = open_storage(backend, &data_dir).await?;
    let store = Store::new(storage);
    let mut notices = store.subscribe();

    let result = match command {
        Command::Idea(command) => handle_idea(&store, command).await,
        Command::Task(command) => handle_task(&store, command).await,
        Command::Export(args) => handle_export(&store, args).await,
        Command::Import(args) => handle_import(&store, args).await,
        Command::Watch => handle_watch(&store, &mut notices).await,
    };
    print_notices(&mut notices);
    result
}

async fn open_storage(backend: BackendArg, data_dir: &Path) -> Result<AnyStorage, AppError> {
    match backend {
        BackendArg::File => Ok(AnyStorage::File(FileStorage::new(data_dir))),
        BackendArg::Sqlite => SqliteStorage::open(&db::resolve_db_path(data_dir))
            .await
            .map(AnyStorage::Sqlite)
            .map_err(AppError::StorageRead),
    }
}

async fn handle_idea(store: &AppStore, command: IdeaCommand) -> Result<(), AppError> {
    match command {
        IdeaCommand::Add(args) => handle_idea_add(store, args).await,
        IdeaCommand::List(args) => handle_idea_list(store, args).await,
        IdeaCommand::Show(args) => handle_idea_show(store, args).await,
        IdeaCommand::Update(args) => handle_idea_update(store, args).await,
        IdeaCommand::Status(args) => handle_idea_status(store, args).await,
        IdeaCommand::Remove(args) => handle_idea_remove(store, args).await,
    }
}

async fn handle_task(store: &AppStore, command: TaskCommand) -> Result<(), AppError> {
    match command {
        TaskCommand::Add(args) => handle_task_add(store, args).await,
        TaskCommand::List(args) => handle_task_list(store, args).await,
        TaskCommand::Done(args) => handle_task_completion(store, args, true).await,
        TaskCommand::Undo(args) => handle_task_completion(store, args, false).await,
        TaskCommand::Update(args) => handle_task_update(store, args).await,
        TaskCommand::Remove(args) => handle_task_remove(store, args).await,
    }
}

async fn handle_idea_add(store: &AppStore, args: IdeaAdd) -> Result<(), AppError> {
    let idea = store
        .add_idea(IdeaInput {
            title: args.title,
            category: category_from_arg(args.category),
            description: args.description,
            status: status_from_arg(args.status),
            notes: args.notes,
        })
        .await?;

    println!("Created idea ID: {}: {}", idea.id, idea.title);
    Ok(())
}

async fn handle_idea_list(store: &AppStore, args: IdeaList) -> Result<(), AppError> {
    let ideas = store.search(args.search.as_deref().unwrap_or("")).await?;
    if ideas.is_empty() {
        println!("No ideas found.");
        return Ok(());
    }
    for idea in &ideas {
        println!("{}", format_idea_line(idea));
    }
    Ok(())
}

async fn handle_idea_show(store: &AppStore, args: IdeaShow) -> Result<(), AppError> {
    let idea = store.get_idea(&args.id).await?;
    println!("{}", format_idea_detail(&idea));
    Ok(())
}

async fn handle_idea_update(store: &AppStore, args: IdeaUpdate) -> Result<(), AppError> {
    let IdeaUpdate {
        id,
        title,
        category,
        description,
        status,
        notes,
    } = args;
    if title.is_none()
        && category.is_none()
        && description.is_none()
        && status.is_none()
        && notes.is_none()
    {
        return Err(AppError::InvalidInput(
            "idea update requires at least one field to change".to_string(),
        ));
    }

    let mut idea = store.get_idea(&id).await?;
    if let Some(title) = title {
        idea.title = title;
    }
    if let Some(category) = category {
        idea.category = category_from_arg(category);
    }
    if let Some(description) = description {
        idea.description = description;
    }
    if let Some(status) = status {
        idea.status = status_from_arg(status);
    }
    if let Some(notes) = notes {
        idea.notes = notes;
    }
    let idea = store.update_idea(idea).await?;
    println!("Updated idea ID: {}", idea.id);
    Ok(())
}

async fn handle_idea_status(store: &AppStore, args: IdeaStatus) -> Result<(), AppError> {
    let idea = store
        .set_status(&args.id, status_from_arg(args.status))
        .await?;
    println!("Idea ID: {} is now {}", idea.id, idea.status.as_str());
    Ok(())
}

async fn handle_idea_remove(store: &AppStore, args: IdeaRemove) -> Result<(), AppError> {
    store.delete_idea(&args.id).await?;
    println!("Removed idea ID: {}", args.id);
    Ok(())
}

async fn handle_task_add(store: &AppStore, args: TaskAdd) -> Result<(), AppError> {
    let due_date = args.due.as_deref().map(parse_due_date).transpose()?;
    let task = store.add_task(&args.idea_id, args.title, due_date).await?;
    println!("Created task ID: {} for idea ID: {}", task.id, task.idea_id);
    Ok(())
}

async fn handle_task_list(store: &AppStore, args: TaskList) -> Result<(), AppError> {
    let filter = if args.upcoming {
        TaskFilter::Upcoming
    } else {
        TaskFilter::All
    };
    let groups = store.list_tasks(filter).await?;
    if groups.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }
    println!("{}", format_task_groups(&groups));
    Ok(())
}

async fn handle_task_completion(
    store: &AppStore,
    args: TaskRef,
    completed: bool,
) -> Result<(), AppError> {
    let task = find_task(store, &args).await?;
    let task = store.update_task(Task { completed, ..task }).await?;
    let state = if task.completed { "done" } else { "open" };
    println!("Task ID: {} marked {state}", task.id);
    Ok(())
}

async fn handle_task_update(store: &AppStore, args: TaskUpdate) -> Result<(), AppError> {
    if args.title.is_none() && args.due.is_none() && !args.clear_due {
        return Err(AppError::InvalidInput(
            "task update requires --title, --due or --clear-due".to_string(),
        ));
    }
    let due_date = args.due.as_deref().map(parse_due_date).transpose()?;
    let mut task = find_task(
        store,
        &TaskRef {
            idea_id: args.idea_id,
            task_id: args.task_id,
        },
    )
    .await?;
    if let Some(title) = args.title {
        task.title = title;
    }
    if args.clear_due {
        task.due_date = None;
    } else if due_date.is_some() {
        task.due_date = due_date;
    }
    let task = store.update_task(task).await?;
    println!("Updated task ID: {}", task.id);
    Ok(())
}

async fn handle_task_remove(store: &AppStore, args: TaskRef) -> Result<(), AppError> {
    store.delete_task(&args.idea_id, &args.task_id).await?;
    println!("Removed task ID: {}", args.task_id);
    Ok(())
}

async fn handle_export(store: &AppStore, args: ExportArgs) -> Result<(), AppError> {
    let payload = store.export_data().await?;
    let Some(path) = args.output else {
        println!("{payload}");
        return Ok(());
    };
    let path = resolve_export_path(path);
    db::ensure_parent_dir(&path)?;
    fs::write(&path, payload)?;
    println!("Exported data to {}", path.display());
    Ok(())
}

async fn handle_import(store: &AppStore, args: ImportArgs) -> Result<(), AppError> {
    let payload = match args.file {
        Some(path) => fs::read_to_string(&path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    if payload.trim().is_empty() {
        return Err(AppError::InvalidInput("import payload is empty".to_string()));
    }
    let count = store.import_data(&payload).await?;
    println!("Imported {count} ideas");
    Ok(())
}

async fn handle_watch(store: &AppStore, events: &mut Receiver<StoreEvent>) -> Result<(), AppError> {
    let Some(_watcher) = store.watch_external()? else {
        return Err(AppError::InvalidInput(
            "this backend cannot report external changes; use --backend file".to_string(),
        ));
    };
    println!("Watching for changes (Ctrl-C to stop)");
    loop {
        match events.recv().await {
            Ok(StoreEvent::DataChanged(ChangeOrigin::External)) => {
                let ideas = store.load().await?;
                let tasks: usize = ideas.iter().map(|idea| idea.tasks.len()).sum();
                println!("Data changed: {} ideas, {} tasks", ideas.len(), tasks);
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(target: "watch", skipped, "Dropped change events");
            }
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}

async fn find_task(store: &AppStore, args: &TaskRef) -> Result<Task, AppError> {
    store.get_task(&args.idea_id, &args.task_id).await
}

fn resolve_export_path(path: PathBuf) -> PathBuf {
    if path.is_dir() {
        path.join(EXPORT_FILE_NAME)
    } else {
        path
    }
}

fn print_notices(events: &mut Receiver<StoreEvent>) {
    loop {
        match events.try_recv() {
            Ok(StoreEvent::Notice(notice)) => match notice.level {
                NoticeLevel::Success => eprintln!("[ok] {}", notice.message),
                NoticeLevel::Error => eprintln!("[error] {}", notice.message),
            },
            Ok(StoreEvent::DataChanged(_)) => {}
            Err(TryRecvError::Lagged(_)) => {}
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}

fn category_from_arg(arg: CategoryArg) -> Category {
    match arg {
        CategoryArg::Business => Category::Business,
        CategoryArg::Tech => Category::Tech,
        CategoryArg::Study => Category::Study,
        CategoryArg::Investment => Category::Investment,
        CategoryArg::Personal => Category::Personal,
        CategoryArg::Other => Category::Other,
    }
}

fn status_from_arg(arg: StatusArg) -> Status {
    match arg {
        StatusArg::Concept => Status::Concept,
        StatusArg::Prototype => Status::Prototype,
        StatusArg::Testing => Status::Testing,
        StatusArg::Implementation => Status::Implementation,
    }
}
