use std::fmt;

/// The three dataset splits. The prefixes double as cache file name stems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    Trn,
    Val,
    Tst,
}

impl Split {
    pub fn prefix(self) -> &'static str {
        match self {
            Split::Trn => "trn",
            Split::Val => "val",
            Split::Tst => "tst",
        }
    }

    /// `trn_en_ids.json`
    pub fn ids_file(self, lang: &str) -> String {
        format!("{}_{lang}_ids.json", self.prefix())
    }

    /// `trn_en_lbl.json`
    pub fn labels_file(self, lang: &str) -> String {
        format!("{}_{lang}_lbl.json", self.prefix())
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl std::str::FromStr for Split {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "trn" | "train" => Ok(Split::Trn),
            "val" | "valid" => Ok(Split::Val),
            "tst" | "test" => Ok(Split::Tst),
            other => anyhow::bail!("Unknown split '{other}' (expected trn, val or tst)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_file_names() {
        assert_eq!(Split::Trn.ids_file("en"), "trn_en_ids.json");
        assert_eq!(Split::Tst.labels_file("de"), "tst_de_lbl.json");
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("test".parse::<Split>().unwrap(), Split::Tst);
        assert_eq!("val".parse::<Split>().unwrap(), Split::Val);
        assert!("dev".parse::<Split>().is_err());
    }
}
