use sfp_format::SfpReader;

use crate::cli::InputArgs;
use crate::error::Error;
use crate::util::{format_size, resolve_input};

fn format_magic(magic: &[u8]) -> String {
    magic
        .iter()
        .flat_map(|b| std::ascii::escape_default(*b))
        .map(char::from)
        .collect()
}

pub fn run(args: InputArgs) -> anyhow::Result<()> {
    for input in &args.inputs {
        for archive in resolve_input(input)? {
            let reader = SfpReader::open(&archive).map_err(|source| Error::OpenArchive {
                path: archive.clone(),
                source,
            })?;
            let header = reader.header();
            let entries = reader.entries();

            let files = entries.iter().filter(|r| r.is_file()).count();
            let payload: u64 = entries
                .iter()
                .filter(|r| r.is_file())
                .map(|r| u64::from(r.data_length))
                .sum();
            let label = reader
                .names()
                .get(header.package_label_offset)
                .unwrap_or("-");

            println!("Archive:          {}", archive.display());
            println!("Magic:            {}", format_magic(&header.magic));
            println!("Version:          {}", header.version);
            println!(
                "Size:             {} ({} bytes)",
                format_size(header.archive_size),
                header.archive_size
            );
            println!("First entry:      {:#x}", header.first_entry_offset);
            println!(
                "Name table:       {:#x}..{:#x}",
                header.name_table_offset, header.data_offset
            );
            println!(
                "Package label:    {:#x} ({})",
                header.package_label_offset, label
            );
            println!("Names:            {}", reader.names().len());
            println!("Directories:      {}", entries.len() - files);
            println!("Files:            {} ({})", files, format_size(payload));
            println!("Damaged entries:  {}", entries.faults().len());
            println!();
        }
    }

    Ok(())
}
