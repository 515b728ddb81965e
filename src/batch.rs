//! 批量分析：每个输入文件构建一个独立的引擎并运行有界性求解器。
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, info, warn};

use crate::analysis::boundness::{BoundednessReport, check_boundedness};
use crate::config::{PnConfig, ReportFormat};
use crate::net::io;

pub struct BatchSolver {
    files: Vec<PathBuf>,
    config: PnConfig,
    dot_dir: Option<PathBuf>,
    results: Vec<BoundednessReport>,
}

impl BatchSolver {
    pub fn new(files: Vec<PathBuf>, config: PnConfig) -> Self {
        Self {
            files,
            config,
            dot_dir: None,
            results: Vec::new(),
        }
    }

    /// 为每个输入写出一个 `<stem>.dot`。
    pub fn with_dot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dot_dir = Some(dir.into());
        self
    }

    pub fn solve(&mut self) -> &[BoundednessReport] {
        let files = std::mem::take(&mut self.files);
        for file in &files {
            let report = self.check_single_file(file);
            info!("{}", report);
            self.results.push(report);
        }
        self.files = files;
        &self.results
    }

    pub fn results(&self) -> &[BoundednessReport] {
        &self.results
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.results.iter().map(|r| r.to_string()).collect()),
            ReportFormat::Json => {
                io::to_json_string(&self.results).context("Failed to serialize report")
            }
        }
    }

    fn check_single_file(&self, file: &Path) -> BoundednessReport {
        info!("Checking {}", file.display());
        let description = match io::read_description(file) {
            Ok(description) => description,
            Err(err) => {
                error!("cannot load {}: {}", file.display(), err);
                return BoundednessReport::failed(Some(file.to_path_buf()), err.to_string());
            }
        };

        let (mut net, skipped) = description.build(self.config.engine_config());
        if !skipped.is_empty() {
            warn!(
                "{}: skipped {} faulty element(s)",
                file.display(),
                skipped.len()
            );
        }

        let mut report = match check_boundedness(&mut net) {
            Ok(report) => report,
            Err(err) => {
                error!("analysis of {} aborted: {}", file.display(), err);
                BoundednessReport::failed(None, err.to_string())
            }
        };
        report.file = Some(file.to_path_buf());

        if let Some(dir) = self.dot_target_dir(file) {
            let stem = file.file_stem().unwrap_or(file.as_os_str());
            let path = dir.join(format!("{}.dot", stem.to_string_lossy()));
            if let Err(err) = net.reachability_graph().write_dot(&path) {
                warn!("cannot write {}: {}", path.display(), err);
            }
        }
        report
    }

    fn dot_target_dir(&self, file: &Path) -> Option<PathBuf> {
        match &self.dot_dir {
            Some(dir) => Some(dir.clone()),
            None if self.config.write_dot => {
                Some(file.parent().map(Path::to_path_buf).unwrap_or_default())
            }
            None => None,
        }
    }
}
