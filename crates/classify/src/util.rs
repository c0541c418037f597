use crate::Category;
use std::fmt::{Display, Formatter, Result as FmtResult};

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl AsRef<str> for Category {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Category {
    /// Short lowercase name, used for storage and display.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Pdf => "pdf",
            Category::Office => "office",
            Category::Image => "image",
            Category::Text => "text",
            Category::Archive => "archive",
            Category::Code => "code",
            Category::Data => "data",
            Category::Other => "other",
        }
    }

    /// Whether files in this category are likely to benefit from OCR.
    #[inline]
    #[must_use]
    pub fn is_ocr_eligible(&self) -> bool {
        matches!(self, Category::Pdf | Category::Image | Category::Office)
    }
}

#[cfg(test)]
mod tests {
    use crate::Category;
    use rstest::rstest;

    #[rstest]
    #[case(Category::Pdf, true)]
    #[case(Category::Office, true)]
    #[case(Category::Image, true)]
    #[case(Category::Text, false)]
    #[case(Category::Archive, false)]
    #[case(Category::Code, false)]
    #[case(Category::Data, false)]
    #[case(Category::Other, false)]
    fn test_ocr_eligible(#[case] category: Category, #[case] expected: bool) {
        assert_eq!(category.is_ocr_eligible(), expected);
    }

    #[test]
    fn test_display() {
        assert_eq!(Category::Archive.to_string(), "archive");
        assert_eq!(format!("{:>6}", Category::Pdf.as_str()), "   pdf");
    }
}
