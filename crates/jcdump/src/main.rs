use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use jcdump_core::prelude::*;
use jcdump_utils::config::parse_pointer_bits;
use jcdump_utils::{debug, info, init_logging, init_logging_with_level, LogFormat, LogLevel, Settings};

/// Inspect JVM javacore snapshots and classify dump archives.
#[derive(Parser, Debug)]
#[command(name = "jcdump")]
#[command(version)]
#[command(about = "Inspect JVM javacore snapshots and classify dump archives", long_about = None)]
struct Cli
{
    /// Log level (error, warn, info, debug, trace). Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<LogLevelArg>,

    /// Pointer width of the dumped process (32 or 64). Overrides JCDUMP_POINTER_BITS.
    #[arg(long, global = true, value_parser = parse_bits)]
    pointer_bits: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Report the kind of each file (core, javacore, phd, meta, unknown)
    Classify
    {
        /// Files to classify
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List the image sources in a file, zip archive or directory
    Sources
    {
        /// File, archive or directory to scan
        path: PathBuf,
    },
    /// Summarise the runtime in a javacore
    Summary
    {
        /// Javacore file, or an archive holding one
        javacore: PathBuf,
    },
    /// List Java threads with their state and stack
    Threads
    {
        /// Javacore file, or an archive holding one
        javacore: PathBuf,
        /// Frames to show per thread
        #[arg(short, long)]
        frames: Option<usize>,
    },
    /// List monitors with their owners and waiters
    Monitors
    {
        /// Javacore file, or an archive holding one
        javacore: PathBuf,
    },
    /// Print the native memory category tree
    Memory
    {
        /// Javacore file, or an archive holding one
        javacore: PathBuf,
    },
}

#[derive(Debug, Clone, Copy)]
struct LogLevelArg(LogLevel);

impl std::str::FromStr for LogLevelArg
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        s.parse().map(LogLevelArg).map_err(|e: jcdump_utils::LoggingError| e.to_string())
    }
}

fn parse_bits(value: &str) -> Result<u32, String>
{
    parse_pointer_bits(value).map_err(|e| e.to_string())
}

fn main()
{
    let cli = Cli::parse();

    // An explicit --log-level wins over RUST_LOG
    let logging = match cli.log_level {
        Some(LogLevelArg(level)) => init_logging_with_level(level, log_format_from_env()),
        None => init_logging(),
    };
    if let Err(e) = logging {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(1);
    }

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    let settings = match cli.pointer_bits {
        Some(bits) => settings.with_pointer_bits(bits),
        None => settings,
    };

    if let Err(e) = run_command(cli.command, settings) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn log_format_from_env() -> LogFormat
{
    std::env::var(jcdump_utils::logging::LOG_FORMAT_VAR)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(LogFormat::Pretty)
}

fn run_command(command: Commands, settings: Settings) -> DumpResult<()>
{
    let manager = ImageSourceManager::new();
    match command {
        Commands::Classify { files } => {
            for file in files {
                match manager.classify_path(&file) {
                    Ok(kind) => println!("{}: {kind}", file.display()),
                    Err(e) => println!("{}: error: {e}", file.display()),
                }
            }
            Ok(())
        }
        Commands::Sources { path } => {
            let sources = manager.list_sources(&path)?;
            if sources.is_empty() {
                println!("No image sources found in {}", path.display());
            }
            for source in &sources {
                print_source(source);
            }
            Ok(())
        }
        Commands::Summary { javacore } => {
            let image = load_javacore(&manager, &javacore, settings)?;
            println!("Source: {}", image.source());
            if let Some(millis) = image.creation_time() {
                println!("Created: {}", format_millis(millis));
            }
            for summary in image.summary() {
                print!("{summary}");
            }
            Ok(())
        }
        Commands::Threads { javacore, frames } => {
            let settings = settings.with_max_frames(frames.or(settings.max_frames()));
            let image = load_javacore(&manager, &javacore, settings)?;
            for runtime in image.runtimes() {
                let mut threads: Vec<&JavaThread> = runtime.threads().collect();
                threads.sort_by_key(|thread| thread.address());
                println!("{} thread(s) in runtime {}", threads.len(), runtime.id());
                for thread in threads {
                    print_thread(thread);
                }
            }
            Ok(())
        }
        Commands::Monitors { javacore } => {
            let image = load_javacore(&manager, &javacore, settings)?;
            for runtime in image.runtimes() {
                print_monitors(runtime);
            }
            Ok(())
        }
        Commands::Memory { javacore } => {
            let image = load_javacore(&manager, &javacore, settings)?;
            for runtime in image.runtimes() {
                if runtime.memory_categories().is_empty() {
                    println!("No native memory information in runtime {}", runtime.id());
                }
                for category in runtime.memory_categories() {
                    print!("{}", category.render_tree());
                }
            }
            Ok(())
        }
    }
}

/// Read the first javacore found at `path`.
fn load_javacore(manager: &ImageSourceManager, path: &Path, settings: Settings) -> DumpResult<JavaCoreImage>
{
    let sources = manager.list_sources(path)?;
    let source = sources
        .iter()
        .find(|source| source.kind() == ImageKind::JavaCore)
        .or_else(|| {
            sources
                .iter()
                .filter_map(ImageSource::metadata)
                .find(|meta| meta.kind() == ImageKind::JavaCore)
        })
        .ok_or_else(|| DumpError::UnsupportedFormat(format!("no javacore found in {}", path.display())))?;

    info!("reading {}", source.name());
    let reader = JavaCoreReader::new(Arc::new(JavaCoreAddressSpace::new(settings.pointer_bits())))
        .with_max_frames(settings.max_frames());
    reader.read_source(manager, source)
}

fn print_source(source: &ImageSource)
{
    match source.entry() {
        Some(entry) => println!("{:<9} {} ({entry})", source.kind().to_string(), source.path().display()),
        None => println!("{:<9} {}", source.kind().to_string(), source.path().display()),
    }
    if let Some(meta) = source.metadata() {
        println!("          metadata: {} [{}]", meta.path().display(), meta.kind());
    }
}

fn print_thread(thread: &JavaThread)
{
    let state = thread.state().map_or_else(|_| "<unavailable>".to_string(), state_label);
    let priority = thread
        .priority()
        .map_or_else(|_| "?".to_string(), |priority| priority.to_string());
    println!("\"{}\" {} state={state} prio={priority}", thread.name(), thread.address());
    if let Ok(native) = thread.image_thread() {
        if let Some(tid) = native.system_thread_id() {
            println!("    native thread id: {tid:#x}");
        }
    }
    for frame in thread.frames() {
        println!("    at {}", frame.location());
    }
}

/// Short label for a thread state, as javacore spells it.
fn state_label(state: ThreadState) -> String
{
    let label = if state.contains(ThreadState::BLOCKED_ON_MONITOR_ENTER) {
        "Blocked"
    } else if state.contains(ThreadState::PARKED) {
        "Parked"
    } else if state.contains(ThreadState::IN_OBJECT_WAIT) {
        "Waiting"
    } else if state.contains(ThreadState::RUNNABLE) {
        "Runnable"
    } else if state.contains(ThreadState::TERMINATED) {
        "Terminated"
    } else {
        return format!("{:#x}", state.bits());
    };
    label.to_string()
}

fn print_monitors(runtime: &JavaRuntime)
{
    let mut monitors: Vec<_> = runtime.monitors().collect();
    monitors.sort_by_key(|monitor| monitor.address());
    println!("{} monitor(s) in runtime {}", monitors.len(), runtime.id());
    for monitor in monitors {
        let owner = match monitor.owner(runtime) {
            Ok(Some(thread)) => format!("\"{}\"", thread.name()),
            Ok(None) => "<unowned>".to_string(),
            Err(e) => {
                debug!("owner of {} unresolved: {e}", monitor.address());
                format!("<{e}>")
            }
        };
        println!("{} owner: {owner}", monitor.name());
        for waiter in monitor.enter_waiters(runtime) {
            match waiter {
                Ok(thread) => println!("    waiting to enter: \"{}\"", thread.name()),
                Err(corrupt) => println!("    waiting to enter: <{corrupt}>"),
            }
        }
        for waiter in monitor.notify_waiters(runtime) {
            match waiter {
                Ok(thread) => println!("    waiting to be notified: \"{}\"", thread.name()),
                Err(corrupt) => println!("    waiting to be notified: <{corrupt}>"),
            }
        }
    }
}

fn format_millis(millis: i64) -> String
{
    chrono::DateTime::from_timestamp_millis(millis)
        .map_or_else(|| millis.to_string(), |time| time.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string())
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use super::*;

    const JAVACORE: &str = "\
0SECTION       TITLE subcomponent dump routine
1TIDATETIME    Date: 2024/01/02 at 10:10:10:123
1CIJAVAVERSION JRE 17.0.9 Linux amd64-64
3XMTHREADINFO      \"main\" J9VMThread:0x0000000001D20500, omrthread_t:0x00007F0000001000, java/lang/Thread:0x00000000FFF00010, state:R, prio=5
4XESTACKTRACE                at com/example/App.main(App.java:10)
";

    #[test]
    fn test_state_label()
    {
        assert_eq!(state_label(ThreadState::from_code("R").unwrap()), "Runnable");
        assert_eq!(state_label(ThreadState::from_code("B").unwrap()), "Blocked");
        assert_eq!(state_label(ThreadState::from_code("P").unwrap()), "Parked");
        assert_eq!(state_label(ThreadState::ALIVE), "0x1");
    }

    #[test]
    fn test_load_javacore_from_directory()
    {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("javacore.20240102.101010.4242.0001.txt"), JAVACORE).unwrap();
        fs::write(dir.path().join("notes.txt"), "nothing to see").unwrap();

        let manager = ImageSourceManager::new();
        let image = load_javacore(&manager, dir.path(), Settings::default()).unwrap();
        let runtime = &image.runtimes()[0];
        assert_eq!(runtime.version().unwrap(), "JRE 17.0.9 Linux amd64-64");
        assert_eq!(runtime.threads().count(), 1);
    }

    #[test]
    fn test_load_rejects_directory_without_javacore()
    {
        let dir = tempfile::tempdir().unwrap();
        let manager = ImageSourceManager::new();
        let err = load_javacore(&manager, dir.path(), Settings::default()).unwrap_err();
        assert!(matches!(err, DumpError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_format_millis()
    {
        assert_eq!(format_millis(0), "1970-01-01 00:00:00.000 UTC");
    }

    #[test]
    fn test_cli_parses_global_flags()
    {
        let cli = Cli::try_parse_from(["jcdump", "threads", "jc.txt", "--pointer-bits", "32", "-f", "3"]).unwrap();
        assert_eq!(cli.pointer_bits, Some(32));
        assert!(matches!(cli.command, Commands::Threads { frames: Some(3), .. }));
        assert!(Cli::try_parse_from(["jcdump", "summary", "jc.txt", "--pointer-bits", "48"]).is_err());
    }
}
