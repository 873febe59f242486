use anyhow::{Context, bail};
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const DEFAULT_MODULEFILE_ROOT: &str = "/apps/modulefiles/lab/miket";
const DEFAULT_INSTALL_ROOT: &str = "/apps/lab/miket";
const DEFAULT_EDITOR: &str = "vim";

/// Creates `<modulefile-root>/<module>/<version>`, which puts
/// `<install-root>/<module>/<version>` on `$PATH`.
#[derive(Args, Debug, Clone)]
pub struct AddModuleArgs {
    /// Module name
    pub module: String,
    /// Module version
    pub version: String,
    /// Add `<module>/<version>/bin` to $PATH instead
    #[arg(short = 'b', long)]
    pub bin_root: bool,
    /// Prepend `<module>/<version>/lib` to LD_LIBRARY_PATH
    #[arg(short = 'L', long)]
    pub add_lib: bool,
    /// Prepend `<module>/<version>/include` to C_INCLUDE_PATH and CPLUS_INCLUDE_PATH
    #[arg(short = 'I', long)]
    pub add_include: bool,
    /// Overwrite an existing modulefile
    #[arg(short = 'f', long)]
    pub overwrite: bool,
    /// Open the modulefile in $EDITOR, writing the template first if it does not exist
    #[arg(short = 'e', long)]
    pub edit: bool,
    #[arg(long, value_name = "DIR", default_value = DEFAULT_MODULEFILE_ROOT)]
    pub modulefile_root: PathBuf,
    #[arg(long, value_name = "DIR", default_value = DEFAULT_INSTALL_ROOT)]
    pub install_root: PathBuf,
}

pub fn run(args: &AddModuleArgs) -> anyhow::Result<()> {
    let path = prepare(args)?;
    if args.edit {
        open_editor(&path)?;
    }
    Ok(())
}

/// Writes the modulefile unless it already exists and is only being edited.
fn prepare(args: &AddModuleArgs) -> anyhow::Result<PathBuf> {
    let module_dir = args.modulefile_root.join(&args.module);
    fs::create_dir_all(&module_dir)
        .with_context(|| format!("failed to create {}", module_dir.display()))?;

    let path = module_dir.join(&args.version);
    if path.exists() {
        if args.edit {
            return Ok(path);
        }
        if !args.overwrite {
            bail!("Modulefile already exists! Use -f to overwrite.");
        }
        log::info!("overwriting {}", path.display());
    }

    fs::write(&path, render(args))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

pub fn render(args: &AddModuleArgs) -> String {
    let module = &args.module;
    let version = &args.version;
    let root = format!("${module}_root");
    let path = if args.bin_root {
        format!("{root}/bin")
    } else {
        root.clone()
    };
    let install_dir = args.install_root.join(module).join(version);

    let mut text = format!(
        "#%Module1.0
#
# {module} v{version}
#
proc ModulesHelp {{ }} {{
        global version

        puts stderr \"\tThis loads {module}-{version} environment\"
}}

module-whatis   \"Loads {module}-{version} environment\"

set     {module}version    {version}
set     {module}_root      {install_dir}
prepend-path    PATH    {path}
",
        install_dir = install_dir.display()
    );

    if args.add_lib {
        text.push_str(&format!("prepend-path    LD_LIBRARY_PATH    {root}/lib\n"));
    }
    if args.add_include {
        for var in ["C_INCLUDE_PATH", "CPLUS_INCLUDE_PATH"] {
            text.push_str(&format!("prepend-path    {var}    {root}/include\n"));
        }
    }
    text
}

fn open_editor(path: &Path) -> anyhow::Result<()> {
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| DEFAULT_EDITOR.to_string());
    let status = Command::new(&editor)
        .arg(path)
        .status()
        .with_context(|| format!("failed to launch editor `{editor}`"))?;
    if !status.success() {
        log::warn!("editor `{}` exited with {}", editor, status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(root: &Path) -> AddModuleArgs {
        AddModuleArgs {
            module: "samtools".to_string(),
            version: "1.3".to_string(),
            bin_root: false,
            add_lib: false,
            add_include: false,
            overwrite: false,
            edit: false,
            modulefile_root: root.to_path_buf(),
            install_root: PathBuf::from("/apps/lab/miket"),
        }
    }

    #[test]
    fn test_render_default_template() {
        let text = render(&args(Path::new("/tmp")));
        let expected = "#%Module1.0
#
# samtools v1.3
#
proc ModulesHelp { } {
        global version

        puts stderr \"\tThis loads samtools-1.3 environment\"
}

module-whatis   \"Loads samtools-1.3 environment\"

set     samtoolsversion    1.3
set     samtools_root      /apps/lab/miket/samtools/1.3
prepend-path    PATH    $samtools_root
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_bin_lib_include() {
        let mut args = args(Path::new("/tmp"));
        args.bin_root = true;
        args.add_lib = true;
        args.add_include = true;
        let text = render(&args);
        assert!(text.contains("prepend-path    PATH    $samtools_root/bin\n"));
        assert!(text.ends_with(
            "prepend-path    LD_LIBRARY_PATH    $samtools_root/lib\n\
             prepend-path    C_INCLUDE_PATH    $samtools_root/include\n\
             prepend-path    CPLUS_INCLUDE_PATH    $samtools_root/include\n"
        ));
    }

    #[test]
    fn test_prepare_creates_module_dir() {
        let dir = tempdir().unwrap();
        let path = prepare(&args(dir.path())).unwrap();
        assert_eq!(path, dir.path().join("samtools").join("1.3"));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("#%Module1.0\n"));
    }

    #[test]
    fn test_existing_modulefile_needs_overwrite() {
        let dir = tempdir().unwrap();
        let mut args = args(dir.path());
        let path = prepare(&args).unwrap();
        fs::write(&path, "custom\n").unwrap();

        let err = prepare(&args).unwrap_err();
        assert!(err.to_string().contains("Use -f to overwrite"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "custom\n");

        args.overwrite = true;
        prepare(&args).unwrap();
        assert_ne!(fs::read_to_string(&path).unwrap(), "custom\n");
    }

    #[test]
    fn test_edit_keeps_existing_content() {
        let dir = tempdir().unwrap();
        let mut args = args(dir.path());
        let path = prepare(&args).unwrap();
        fs::write(&path, "custom\n").unwrap();

        args.edit = true;
        assert_eq!(prepare(&args).unwrap(), path);
        assert_eq!(fs::read_to_string(&path).unwrap(), "custom\n");
    }
}
