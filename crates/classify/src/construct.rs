use crate::error::{Error, ErrorKind};
use crate::{Category, extension};
use std::str::FromStr;

impl FromStr for Category {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(Category::Pdf),
            "office" => Ok(Category::Office),
            "image" => Ok(Category::Image),
            "text" => Ok(Category::Text),
            "archive" => Ok(Category::Archive),
            "code" => Ok(Category::Code),
            "data" => Ok(Category::Data),
            "other" => Ok(Category::Other),
            _ => exn::bail!(ErrorKind::UnknownCategory(s.to_string())),
        }
    }
}

impl Category {
    /// Detect the category from a file name's extension (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        extension(name).map(|ext| Self::from_extension(&ext)).unwrap_or(Category::Other)
    }

    /// Look up an already-lowercased extension (without the leading dot).
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "pdf" => Category::Pdf,
            "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" => Category::Office,
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "tiff" => Category::Image,
            "txt" | "log" | "csv" => Category::Text,
            "zip" | "rar" | "7z" | "tar" | "gz" => Category::Archive,
            "py" | "js" | "java" | "cpp" | "html" | "css" | "sql" => Category::Code,
            "json" | "xml" | "yaml" => Category::Data,
            _ => Category::Other,
        }
    }
}
