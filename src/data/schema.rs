use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::model::TownTable;

// ---------------------------------------------------------------------------
// Segmentation axes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Worker,
    Employee,
    MiddleManager,
    Executive,
}

/// Age brackets are fixed: young 18–25, medium 26–50, old 51+.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBracket {
    Young,
    Medium,
    Old,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn display_name(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Worker,
        Category::Employee,
        Category::MiddleManager,
        Category::Executive,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Category::Worker => "Worker",
            Category::Employee => "Employee",
            Category::MiddleManager => "Middle manager",
            Category::Executive => "Executive",
        }
    }
}

impl AgeBracket {
    pub const ALL: [AgeBracket; 3] = [AgeBracket::Young, AgeBracket::Medium, AgeBracket::Old];

    pub fn display_name(self) -> &'static str {
        match self {
            AgeBracket::Young => "Young (18-25)",
            AgeBracket::Medium => "Medium (26-50)",
            AgeBracket::Old => "Old (51+)",
        }
    }
}

// ---------------------------------------------------------------------------
// Explicit (dimension, value) → column mapping
// ---------------------------------------------------------------------------

fn gender_column(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "mean_male_salary",
        Gender::Female => "mean_female_salary",
    }
}

fn category_column(category: Category) -> &'static str {
    match category {
        Category::Worker => "mean_worker_salary",
        Category::Employee => "mean_employee_salary",
        Category::MiddleManager => "mean_middle_manager_salary",
        Category::Executive => "mean_executive_salary",
    }
}

fn age_column(age: AgeBracket) -> &'static str {
    match age {
        AgeBracket::Young => "mean_young_age_salary",
        AgeBracket::Medium => "mean_medium_age_salary",
        AgeBracket::Old => "mean_old_age_salary",
    }
}

fn gender_category_column(gender: Gender, category: Category) -> &'static str {
    use Category::*;
    use Gender::*;
    match (gender, category) {
        (Male, Worker) => "mean_male_worker_salary",
        (Male, Employee) => "mean_male_employee_salary",
        (Male, MiddleManager) => "mean_male_middle_manager_salary",
        (Male, Executive) => "mean_male_executive_salary",
        (Female, Worker) => "mean_female_worker_salary",
        (Female, Employee) => "mean_female_employee_salary",
        (Female, MiddleManager) => "mean_female_middle_manager_salary",
        (Female, Executive) => "mean_female_executive_salary",
    }
}

// ---------------------------------------------------------------------------
// Segment keys and dimensions
// ---------------------------------------------------------------------------

/// Identifies one value of a segmentation dimension. Axes the dimension does
/// not carry are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct SegmentKey {
    pub gender: Option<Gender>,
    pub category: Option<Category>,
    pub age: Option<AgeBracket>,
}

impl SegmentKey {
    pub fn gender(gender: Gender) -> Self {
        Self { gender: Some(gender), ..Default::default() }
    }

    pub fn category(category: Category) -> Self {
        Self { category: Some(category), ..Default::default() }
    }

    pub fn age(age: AgeBracket) -> Self {
        Self { age: Some(age), ..Default::default() }
    }

    pub fn gender_category(gender: Gender, category: Category) -> Self {
        Self {
            gender: Some(gender),
            category: Some(category),
            age: None,
        }
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [
            self.gender.map(Gender::display_name),
            self.category.map(Category::display_name),
            self.age.map(AgeBracket::display_name),
        ]
        .into_iter()
        .flatten()
        .collect();
        write!(f, "{}", parts.join(" / "))
    }
}

/// An axis along which mean salary is decomposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Gender,
    Category,
    Age,
    /// Cartesian product gender × category (inequality view).
    GenderCategory,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Gender,
        Dimension::Category,
        Dimension::Age,
        Dimension::GenderCategory,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Gender => "gender",
            Dimension::Category => "category",
            Dimension::Age => "age",
            Dimension::GenderCategory => "gender_category",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Dimension::Gender => "Gender",
            Dimension::Category => "Socio-professional category",
            Dimension::Age => "Age",
            Dimension::GenderCategory => "Gender × category",
        }
    }

    /// Segment values in display order with the column holding each value.
    pub fn segments(self) -> Vec<(SegmentKey, &'static str)> {
        match self {
            Dimension::Gender => Gender::ALL
                .iter()
                .map(|&g| (SegmentKey::gender(g), gender_column(g)))
                .collect(),
            Dimension::Category => Category::ALL
                .iter()
                .map(|&c| (SegmentKey::category(c), category_column(c)))
                .collect(),
            Dimension::Age => AgeBracket::ALL
                .iter()
                .map(|&a| (SegmentKey::age(a), age_column(a)))
                .collect(),
            Dimension::GenderCategory => Gender::ALL
                .iter()
                .flat_map(|&g| {
                    Category::ALL
                        .iter()
                        .map(move |&c| (SegmentKey::gender_category(g, c), gender_category_column(g, c)))
                })
                .collect(),
        }
    }

    /// Resolve every column of this dimension against the loaded table.
    pub fn resolve(self, table: &TownTable) -> Result<ResolvedDimension, SchemaError> {
        let columns = self
            .segments()
            .into_iter()
            .map(|(key, column)| {
                table
                    .measure_index(column)
                    .map(|idx| (key, idx))
                    .ok_or_else(|| SchemaError::MissingColumn {
                        dimension: self.name(),
                        column: column.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResolvedDimension { dimension: self, columns })
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A dimension whose columns have been located in a specific table.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDimension {
    pub dimension: Dimension,
    /// (segment, index into the table's measure columns)
    pub columns: Vec<(SegmentKey, usize)>,
}

// ---------------------------------------------------------------------------
// Schema validation
// ---------------------------------------------------------------------------

/// Mismatch between the code's column mapping and the dataset header.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("required column '{0}' not found in dataset")]
    MissingIdentifier(String),
    #[error("column '{column}' required by the {dimension} dimension not found in dataset")]
    MissingColumn {
        dimension: &'static str,
        column: String,
    },
}

/// All dimensions resolved against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSchema {
    dimensions: Vec<ResolvedDimension>,
}

impl DatasetSchema {
    /// Fails on the first dimension whose columns are absent.
    pub fn validate(table: &TownTable) -> Result<Self, SchemaError> {
        let dimensions = Dimension::ALL
            .iter()
            .map(|d| d.resolve(table))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { dimensions })
    }

    pub fn resolved(&self, dimension: Dimension) -> &ResolvedDimension {
        // `validate` resolves every member of `Dimension::ALL` in order.
        &self.dimensions[dimension as usize]
    }
}
