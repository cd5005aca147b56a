use std::path::{Path, PathBuf};

use directories_next::{BaseDirs, UserDirs};

pub fn config_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|base| base.config_dir().join("Rigbridge"))
}

/// `<config dir>/settings.yaml`, used when no `--settings` is passed.
pub fn default_settings_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("settings.yaml"))
}

pub fn default_export_dir() -> PathBuf {
    user_dir(|ud| ud.document_dir(), "Exports")
        .unwrap_or_else(|| PathBuf::from("exports"))
}

fn user_dir(
    dir_fn: impl FnOnce(&UserDirs) -> Option<&Path>,
    subfolder: &str,
) -> Option<PathBuf> {
    let primary_path = UserDirs::new().and_then(|ud| {
        dir_fn(&ud).map(|p| p.join("Rigbridge").join(subfolder))
    });

    let fallback_path = BaseDirs::new().map(|bd| {
        bd.data_local_dir().join("Rigbridge").join(subfolder)
    });

    primary_path.or(fallback_path)
}
