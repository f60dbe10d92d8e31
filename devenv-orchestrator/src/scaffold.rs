//! Project web roots under `<compose_dir>/projects/<slug>`, mounted into each
//! project container.

use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::{debug, info};

use devenv_config::Project;
use devenv_core::DevEnvPaths;

const INDEX_FILE: &str = "index.html";

/// Create the project directory with a placeholder page. Existing content is
/// left alone.
pub fn create(paths: &DevEnvPaths, project: &Project) -> io::Result<PathBuf> {
    let dir = paths.project_dir(&project.slug);
    fs::create_dir_all(&dir)?;

    let index = dir.join(INDEX_FILE);
    if !index.exists() {
        fs::write(&index, index_page(project))?;
        info!("Created {}", index.display());
    }
    Ok(dir)
}

/// Move the directory of a renamed project, then make sure it has a page.
pub fn rename(paths: &DevEnvPaths, old_slug: &str, project: &Project) -> io::Result<PathBuf> {
    let from = paths.project_dir(old_slug);
    let to = paths.project_dir(&project.slug);
    if from != to && from.is_dir() && !to.exists() {
        fs::rename(&from, &to)?;
        debug!("Moved {} to {}", from.display(), to.display());
    }
    create(paths, project)
}

pub fn remove(paths: &DevEnvPaths, slug: &str) -> io::Result<()> {
    let dir = paths.project_dir(slug);
    if dir.exists() {
        fs::remove_dir_all(&dir)?;
        info!("Removed {}", dir.display());
    }
    Ok(())
}

fn index_page(project: &Project) -> String {
    let name = escape(&project.name);
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{name}</title></head>\n<body>\n\
         <h1>Project: {name}</h1>\n<p>Served at {url}</p>\n</body>\n</html>\n",
        url = escape(&project.url),
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
