use kt_cli::{api, Result};

use super::Context;

/// List the first page of files on `disk`
pub fn files(ctx: &Context, disk: &str) -> Result<()> {
    let files = api::list_files(&ctx.gateway, ctx.token()?, disk)?;
    if files.list.is_empty() {
        eprintln!("File list is empty");
        return Ok(());
    }

    let id_width = files.list.iter().map(|f| f.id.len()).max().unwrap_or(2).max(2);
    let name_width = files.list.iter().map(|f| f.name.len()).max().unwrap_or(4).max(4);
    let type_width = files.list.iter().map(|f| f.type_desc.len()).max().unwrap_or(4).max(4);

    println!("{:id_width$}  {:name_width$}  {:type_width$}  SIZE", "ID", "NAME", "TYPE");
    for file in &files.list {
        println!(
            "{:id_width$}  {:name_width$}  {:type_width$}  {}",
            file.id,
            file.name,
            file.type_desc,
            byte_count(file.size)
        );
    }
    Ok(())
}

/// Human readable size with binary prefixes
pub fn byte_count(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{bytes} B");
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let prefix = b"KMGTPE"[exp] as char;
    format!("{:.1} {prefix}iB", bytes as f64 / div as f64)
}
