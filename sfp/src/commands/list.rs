use sfp_format::{EntryKind, EntryRecord, SfpReader};

use crate::cli::InputArgs;
use crate::error::Error;
use crate::util::{format_size, resolve_input};

fn format_path<R>(reader: &SfpReader<R>, record: &EntryRecord) -> String {
    match reader.entry_path(record.offset) {
        Ok(_) if record.is_root() => "/".into(),
        Ok(path) if record.is_dir() => format!("{}/", path),
        Ok(path) => path.to_string(),
        Err(e) => format!("<{}>", e),
    }
}

pub fn run(args: InputArgs) -> anyhow::Result<()> {
    for input in &args.inputs {
        for archive in resolve_input(input)? {
            let reader = SfpReader::open(&archive).map_err(|source| Error::OpenArchive {
                path: archive.clone(),
                source,
            })?;

            println!("{}", archive.display());
            println!("Kind          Length         Offset        Path");
            println!("------------  -------------  ------------  --------");

            for record in reader.entries().iter() {
                let path = format_path(&reader, record);
                match record.kind {
                    EntryKind::Directory => println!(
                        "{:12}  {:>13}  {:#012x}  {}",
                        "<directory>", "-", record.offset, path
                    ),
                    EntryKind::File => println!(
                        "{:12}  {:>13}  {:#012x}  {}",
                        "file",
                        format_size(u64::from(record.data_length)),
                        record.offset,
                        path
                    ),
                }
            }

            for fault in reader.entries().faults() {
                println!(
                    "{:12}  {:>13}  {:#012x}  <{}>",
                    "<damaged>", "-", fault.offset, fault.error
                );
            }
            println!();
        }
    }

    Ok(())
}
