use crate::shared::errors::{AppError, AppResult};

/// 受け入れるメディアタイプの一覧（受付時の判定が正）
///
/// GIFは保存済みデータの表示では許容されるが、新規受付では拒否する
pub const ACCEPTED_MEDIA_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

/// 添付ファイルのメディアタイプを検証する
///
/// # 引数
/// * `content_type` - 申告されたメディアタイプ
///
/// # 戻り値
/// 受け入れ可能ならOk(())、それ以外は`AppError::Validation`
pub fn validate_media_type(content_type: &str) -> AppResult<()> {
    let normalized = content_type.trim().to_ascii_lowercase();

    if ACCEPTED_MEDIA_TYPES.contains(&normalized.as_str()) {
        return Ok(());
    }

    Err(AppError::validation(format!(
        "サポートされていないファイル形式です: {content_type}（JPEG、PNGのみ対応）"
    )))
}

/// 添付ファイル名を検証する
///
/// # 引数
/// * `file_name` - 元のファイル名
pub fn validate_file_name(file_name: &str) -> AppResult<()> {
    if file_name.trim().is_empty() {
        return Err(AppError::validation("ファイル名が指定されていません"));
    }

    Ok(())
}
