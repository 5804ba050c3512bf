use std::path::{Path, PathBuf};
use std::sync::mpsc;

use sfp_format::{ExtractOptions, ExtractProgress, ExtractStats, SfpReader};

use crate::cli::ExtractArgs;
use crate::error::{Error, Result};
use crate::util::resolve_input;

pub fn run(args: ExtractArgs) -> anyhow::Result<()> {
    let options = ExtractOptions {
        overwrite: !args.no_overwrite,
    };

    let mut total = 0;
    let mut failed = 0;
    for input in &args.inputs {
        let archives = resolve_input(input)?;
        if archives.is_empty() {
            tracing::warn!(input = %input.display(), "no archives matched");
        }

        for archive in archives {
            total += 1;
            if let Err(e) = extract_archive(&archive, args.output.as_deref(), &options, args.jobs)
            {
                failed += 1;
                eprintln!("{:?}", anyhow::Error::new(e));
            }
        }
    }

    if failed > 0 {
        return Err(Error::ArchivesFailed { failed, total }.into());
    }

    Ok(())
}

fn extract_archive(
    path: &Path,
    output: Option<&Path>,
    options: &ExtractOptions,
    jobs: usize,
) -> Result<ExtractStats> {
    let found = path.is_file();
    println!("{} {}found.", path.display(), if found { "" } else { "no " });

    let mut reader = SfpReader::open(path).map_err(|source| Error::OpenArchive {
        path: path.to_path_buf(),
        source,
    })?;

    // The archive is valid from here on; only now may the destination be touched.
    let dest = match output {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| Error::CreateDirectory {
                path: dir.to_path_buf(),
                source,
            })?;
            dir.to_path_buf()
        }
        None => default_destination(reader.path().unwrap_or(path))?,
    };

    let (tx, rx) = mpsc::channel::<ExtractProgress>();
    let printer = std::thread::spawn(move || {
        for event in rx {
            print_progress(event);
        }
    });

    let result = if jobs == 1 {
        Ok(reader.extract_all(&dest, options, Some(tx)))
    } else {
        reader.extract_all_parallel(&dest, options, jobs, Some(tx))
    };
    let _ = printer.join();

    let stats = result.map_err(|source| Error::Extract { source })?;
    println!("{}", stats);
    Ok(stats)
}

/// `dir/game.sfp` extracts into `dir/game`.
fn default_destination(archive: &Path) -> Result<PathBuf> {
    if archive.extension().is_none() {
        return Err(Error::NoDestination {
            path: archive.to_path_buf(),
        });
    }
    Ok(archive.with_extension(""))
}

fn print_progress(event: ExtractProgress) {
    match event {
        ExtractProgress::Directory { path } => println!("{}", path.display()),
        ExtractProgress::File { path, bytes } => {
            println!("{} .. {} bytes.", path.display(), bytes)
        }
        ExtractProgress::Skipped { path, bytes } => {
            println!("{} .. {} bytes, kept existing file.", path.display(), bytes)
        }
        ExtractProgress::Failed {
            path: Some(path),
            message,
            ..
        } => println!("{} could not be processed: {}", path.display(), message),
        ExtractProgress::Failed {
            offset,
            path: None,
            message,
        } => println!("Entry at {:#x} could not be processed: {}", offset, message),
    }
}
