/// 按最后一个 `.` 拆分文件名，返回（主干，扩展名）
///
/// # 参数
///
/// * `name` - 文件名
///
/// # 返回值
///
/// 没有 `.` 时扩展名为 `None`，扩展名保持原始大小写
///
/// # 示例
///
/// ```
/// use drive_pictures_to_s3::utils::path::split_extension;
///
/// assert_eq!(split_extension("photo.JPG"), ("photo", Some("JPG")));
/// assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", Some("gz")));
/// assert_eq!(split_extension("noext"), ("noext", None));
/// ```
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (name, None),
    }
}

/// 根据文件名猜测 Content-Type
///
/// # 参数
///
/// * `name` - 文件名
///
/// # 返回值
///
/// 猜测出的 MIME 类型字符串，无法识别时返回 `None`
pub fn guess_content_type(name: &str) -> Option<String> {
    mime_guess::from_path(name)
        .first()
        .map(|mime| mime.essence_str().to_string())
}
