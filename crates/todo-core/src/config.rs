use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::app::AppOptions;
use crate::transform::SortBy;
use crate::view::DEFAULT_ITEMS_PER_PAGE;

#[derive(Debug, Clone)]
pub struct Config {
  map:              HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Config {
  #[tracing::instrument(skip(
    todorc_override
  ))]
  pub fn load(
    todorc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::defaults();

    let todorc = resolve_todorc_path(
      todorc_override
    )?;
    if let Some(path) = todorc {
      info!(todorc = %path.display(), "loading todorc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no todorc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[must_use]
  pub fn defaults() -> Self {
    let mut map = HashMap::new();
    map.insert(
      "data.location".to_string(),
      "~/.todo".to_string()
    );
    map.insert(
      "list.items_per_page".to_string(),
      DEFAULT_ITEMS_PER_PAGE.to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );
    Config {
      map,
      loaded_files: vec![]
    }
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>>
  {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
      .transpose()
      .with_context(|| {
        format!("invalid value for {key}")
      })
  }

  pub fn items_per_page(
    &self
  ) -> anyhow::Result<usize> {
    let Some(raw) =
      self.map.get("list.items_per_page")
    else {
      return Ok(DEFAULT_ITEMS_PER_PAGE);
    };
    let value: usize =
      raw.trim().parse().with_context(
        || {
          format!(
            "list.items_per_page must \
             be a positive integer, \
             got {raw:?}"
          )
        }
      )?;
    if value == 0 {
      return Err(anyhow!(
        "list.items_per_page must be \
         at least 1"
      ));
    }
    Ok(value)
  }

  /// `list.sort`, e.g. `dueDate-asc`.
  /// Empty or unset keeps the stored
  /// order.
  pub fn sort_by(
    &self
  ) -> anyhow::Result<Option<SortBy>> {
    match self.map.get("list.sort") {
      | Some(raw)
        if !raw.trim().is_empty() =>
      {
        raw
          .parse()
          .map(Some)
          .context("invalid list.sort")
      }
      | _ => Ok(None)
    }
  }

  pub fn app_options(
    &self
  ) -> anyhow::Result<AppOptions> {
    Ok(AppOptions {
      items_per_page: self
        .items_per_page()?,
      sort_by:        self.sort_by()?
    })
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }
      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if self
          .loaded_files
          .contains(&include_path)
        {
          warn!(include = %include_path.display(), "include cycle; skipping");
        } else if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get("data.location")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_data_dir()?
  };

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_todorc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(todorc_env) =
    std::env::var("TODORC")
  {
    if todorc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      todorc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping ~/.todorc"
    );
    return Ok(None);
  };
  let candidate = home.join(".todorc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(".todo"))
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let expanded =
    expand_tilde(Path::new(include));
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(
  s: &str
) -> anyhow::Result<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Ok(true),
    | "0" | "n" | "no" | "off"
    | "false" => Ok(false),
    | other => {
      Err(anyhow!(
        "expected on/off, got {other:?}"
      ))
    }
  }
}
