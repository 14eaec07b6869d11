use anyhow::{Context, Result};
use clap::Parser;
use dbexport_import::config::Config;
use dbexport_import::database::{self, DatabaseType};
use dbexport_import::process::{import_export_dir, parse_and_load};
use std::path::PathBuf;
use std::time::Instant;

/// 将 dbexport 导出目录导入到关系型数据库
#[derive(Debug, Parser)]
#[command(name = "dbexport-import", version, about)]
struct Cli {
    /// 导出目录（包含一个 .sql 头文件和若干 .unl 数据文件）
    dir: PathBuf,

    /// TOML 配置文件，命令行参数覆盖其中的值
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 目标 schema
    #[arg(long)]
    schema: Option<String>,

    /// 导入前删除已存在的同名表和视图
    #[arg(long)]
    drop_existing: bool,

    /// 目标数据库类型
    #[arg(long, value_enum)]
    target: Option<DatabaseType>,

    /// 目标连接串：文件型数据库为文件路径，PostgreSQL 为连接串
    #[arg(long)]
    target_url: Option<String>,

    /// 插入时跳过的列名，可重复
    #[arg(long = "skip-column", value_name = "COLUMN")]
    skip_columns: Vec<String>,

    /// 导入报告（JSON）输出路径
    #[arg(long)]
    report: Option<PathBuf>,

    /// 只解析并加载数据文件，不连接目标数据库
    #[arg(long)]
    dry_run: bool,

    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// 读取配置文件并用命令行参数覆盖
    fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("无法加载配置文件: {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(schema) = &self.schema {
            config.import.schema = Some(schema.clone());
        }
        if self.drop_existing {
            config.import.drop_existing = true;
        }
        if let Some(target) = self.target {
            config.target.db_type = target;
        }
        if let Some(url) = &self.target_url {
            config.target.url = url.clone();
        }
        config.import.skip_columns.extend(self.skip_columns.iter().cloned());
        if let Some(report) = &self.report {
            config.import.report_path = Some(report.display().to_string());
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    #[cfg(feature = "logging")]
    dbexport_import::logging::init_logging(&config.log)?;

    if !cli.dir.exists() {
        anyhow::bail!("导出目录不存在: {}", cli.dir.display());
    }

    let start = Instant::now();
    if cli.dry_run {
        let model = parse_and_load(&cli.dir)?;
        println!(
            "校验通过: 数据库 {}，{} 张表，{} 行，{} 个同义词，{} 个索引，{} 个唯一索引，耗时 {:.2?}",
            model.database,
            model.tables.len(),
            model.total_rows(),
            model.synonyms.len(),
            model.indexes.len(),
            model.unique_indexes.len(),
            start.elapsed()
        );
        return Ok(());
    }

    let mut target = database::connect(config.target.db_type, &config.target.url)
        .with_context(|| format!("无法连接目标数据库 {}", config.target.db_type))?;
    let options = config.import_options();
    let report = import_export_dir(&cli.dir, target.as_mut(), &options)?;

    println!("导入完成: {report}");
    for warning in &report.warnings {
        println!(
            "  截断 {}.{} 第{}行: {:?} → {:?}",
            warning.table, warning.column, warning.row, warning.original, warning.truncated
        );
    }
    if let Some(path) = &config.import.report_path {
        report.write_json(path)?;
    }
    Ok(())
}
