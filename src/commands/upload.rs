use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use kt_cli::{KtError, Result, UploadRequest};

use super::Context;

pub struct UploadArgs<'a> {
    pub path: &'a Path,
    pub name: Option<&'a str>,
    pub disk: &'a str,
    pub folder: &'a str,
    pub mime: Option<&'a str>,
    pub plain: bool,
}

/// Upload a local file, or stdin when the path is `-`
pub fn upload(ctx: &Context, args: UploadArgs<'_>) -> Result<()> {
    let name_override = args.name.map(str::trim).filter(|n| !n.is_empty());

    let (name, content): (String, Box<dyn Read + Send>) = if args.path == Path::new("-") {
        let name = name_override.ok_or_else(|| {
            KtError::InvalidArgument("a file name is required for stdin upload (--name)".into())
        })?;
        (name.to_string(), Box::new(io::stdin()))
    } else {
        let metadata = fs::metadata(args.path)?;
        if metadata.is_dir() {
            return Err(KtError::InvalidArgument(format!(
                "{} is a directory; directory uploading is not supported",
                args.path.display()
            )));
        }

        let name = match name_override {
            Some(name) => name.to_string(),
            None => file_name(args.path)?,
        };
        (name, Box::new(File::open(args.path)?))
    };

    let key_material = if args.plain {
        None
    } else {
        Some(ctx.key_material())
    };

    let request = UploadRequest {
        token: ctx.token()?,
        name: &name,
        mime: args.mime,
        disk: args.disk,
        folder: args.folder,
        key_material,
    };

    let file_id = kt_cli::upload(&ctx.gateway, &ctx.observer(), request, content)?;
    println!("{file_id}");
    Ok(())
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| KtError::InvalidArgument(format!("{} has no file name", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_strips_directories() {
        assert_eq!(file_name(Path::new("/tmp/dir/report.pdf")).unwrap(), "report.pdf");
        assert_eq!(file_name(Path::new("notes.txt")).unwrap(), "notes.txt");
    }

    #[test]
    fn test_file_name_requires_component() {
        assert!(matches!(
            file_name(Path::new("/")),
            Err(KtError::InvalidArgument(_))
        ));
    }
}
