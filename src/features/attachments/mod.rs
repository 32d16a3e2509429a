// 添付ファイル（領収書画像）機能のモジュール

pub mod uploader;
pub mod validator;

pub use uploader::{AttachmentCandidate, AttachmentUploader, UploadedAttachment};
