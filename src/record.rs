use serde::Serialize;

/// One catalog entry: nutritional values per 100 g.
///
/// `kcal` is `None` when the source row has no kcal column at all (the
/// legacy table layout), which is distinct from a present-but-blank cell
/// (that parses to 0).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub name: String,
    pub protein: f64,
    pub fat: f64,
    pub carbohydrates: f64,
    pub kcal: Option<f64>,
}

impl std::fmt::Display for Record {
    /// Canonical one-line rendering, Russian field labels as on the site:
    /// `Творог - Б:16.7, Ж:9, У:2 - 159 ккал/100г`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - Б:{}, Ж:{}, У:{} - ",
            self.name, self.protein, self.fat, self.carbohydrates
        )?;
        match self.kcal {
            Some(k) => writeln!(f, "{} ккал/100г", k),
            None => writeln!(f, "- ккал/100г"),
        }
    }
}
