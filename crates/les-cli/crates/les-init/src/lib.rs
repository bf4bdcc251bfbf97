use anyhow::{Context, Result};
use console::style;
use les_config::{ConfigEntry, RC_FILE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const INDEX_HTML: &str = include_str!("templates/index.html");
const GITIGNORE: &str = "node_modules/\ndist/\n";

/// Minimal `package.json` written into a freshly scaffolded app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageJson {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scripts: BTreeMap<String, String>,
}

impl PackageJson {
    pub fn new(name: &str) -> Self {
        let mut scripts = BTreeMap::new();
        scripts.insert("dev".into(), "les --watch".into());
        scripts.insert("start".into(), "les".into());
        Self {
            name: name.into(),
            version: "0.1.0".into(),
            scripts,
        }
    }
}

/// Scaffold a new les app at `dest`.
///
/// Never overwrites: an existing `package.json` or `.lesrc` (or any other
/// starter file) is left untouched, so running init twice is safe.
pub fn run(dest: &Path, init_cfg: &ConfigEntry) -> Result<()> {
    println!();
    println!("  {}", style("les - init a new app").bold().cyan());
    println!();

    fs::create_dir_all(dest.join("public"))
        .with_context(|| format!("failed to create {}", dest.display()))?;

    let mut created = Vec::new();

    let package_file = dest.join("package.json");
    if package_file.exists() {
        println!(
            "  {}",
            style("package.json already exists...will not overwrite").dim()
        );
    } else {
        let name = dest
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("les-app");
        let package = PackageJson::new(name);
        fs::write(&package_file, serde_json::to_string_pretty(&package)?)
            .context("failed to write package.json")?;
        created.push("package.json");
    }

    let rc_file = dest.join(RC_FILE);
    if rc_file.exists() {
        println!(
            "  {}",
            style(".lesrc already exists...will not overwrite").dim()
        );
    } else {
        let cfgs = vec![init_cfg.clone()];
        fs::write(&rc_file, serde_json::to_string_pretty(&cfgs)?)
            .with_context(|| format!("failed to write {RC_FILE}"))?;
        created.push(RC_FILE);
    }

    let index_file = dest.join("public/index.html");
    if !index_file.exists() {
        fs::write(&index_file, INDEX_HTML).context("failed to write public/index.html")?;
        created.push("public/index.html");
    }

    let gitignore_file = dest.join(".gitignore");
    if !gitignore_file.exists() {
        fs::write(&gitignore_file, GITIGNORE).context("failed to write .gitignore")?;
        created.push(".gitignore");
    }

    for file in &created {
        println!("  {}  {}", style("+").green().bold(), style(file).dim());
    }

    println!();
    println!("  {} App created.", style("Done.").green().bold());
    println!();
    println!("  Now run:");
    println!();
    println!("    {}  {}", style("cd").cyan(), dest.display());
    println!("    {}", style("les --watch").cyan());
    println!();

    Ok(())
}
