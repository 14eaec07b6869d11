use crate::database::TargetDatabase;
use crate::dbexport::{ExportModel, ExportParser, UnloadFileLoader};
use crate::error::Result;
use crate::export_dir::ExportDirectory;
use crate::importer::{ImportOptions, SchemaImporter};
use crate::report::ImportReport;
use std::path::Path;
use std::time::Instant;

/// 扫描导出目录并解析头文件，数据文件尚未加载。
///
/// 目录中存在但头文件没有引用的 unload 文件只记录警告。
///
/// # Errors
/// 目录布局不符合要求或头文件格式错误时返回错误
pub fn parse_export_dir<P: AsRef<Path>>(
    dir: P,
) -> Result<(ExportDirectory, ExportModel)> {
    let export = ExportDirectory::scan(dir)?;
    let model = ExportParser::parse_file(export.header())?;

    let unused = export.unreferenced(model.tables.iter().map(|t| t.unload_file.as_str()));
    for name in &unused {
        tracing::warn!("unload 文件 {} 没有被头文件引用，已忽略", name);
    }
    Ok((export, model))
}

/// 解析头文件并加载全部 unload 文件，不访问目标数据库。
///
/// # Errors
/// 任何格式、一致性或取值转换错误都会返回
pub fn parse_and_load<P: AsRef<Path>>(dir: P) -> Result<ExportModel> {
    let start = Instant::now();
    let (export, mut model) = parse_export_dir(dir)?;
    UnloadFileLoader::load_all(export.root(), &mut model)?;
    tracing::info!(
        "解析与加载完成，共 {} 张表 {} 行，耗时: {:.2?}",
        model.tables.len(),
        model.total_rows(),
        start.elapsed()
    );
    Ok(model)
}

/// 把一个导出目录完整导入目标数据库。
///
/// 解析与加载在任何目标库操作之前完成；随后依次建表、建视图、
/// 逐表插入数据、创建索引。
///
/// # Errors
/// 任意阶段失败时返回该阶段的错误
pub fn import_export_dir<P: AsRef<Path>>(
    dir: P,
    target: &mut dyn TargetDatabase,
    options: &ImportOptions,
) -> Result<ImportReport> {
    let (export, model) = parse_export_dir(dir)?;
    let mut importer = SchemaImporter::new(model, options.clone());
    importer.load(export.root())?;
    importer.run(target)?;
    Ok(importer.into_report())
}
