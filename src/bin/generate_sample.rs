use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const GENDERS: [(&str, f64); 2] = [("male", 1.08), ("female", 0.90)];
const CATEGORIES: [(&str, f64); 4] = [
    ("worker", 0.78),
    ("employee", 0.82),
    ("middle_manager", 1.12),
    ("executive", 1.85),
];
const AGES: [(&str, f64); 3] = [("young", 0.72), ("medium", 1.0), ("old", 1.18)];

/// (region, department, centre latitude, centre longitude, salary level)
const DEPARTMENTS: [(&str, &str, f64, f64, f64); 10] = [
    ("Ile-de-France", "Paris", 48.86, 2.35, 1.35),
    ("Ile-de-France", "Hauts-de-Seine", 48.85, 2.22, 1.30),
    ("Auvergne-Rhone-Alpes", "Rhone", 45.76, 4.83, 1.10),
    ("Auvergne-Rhone-Alpes", "Haute-Savoie", 46.00, 6.30, 1.08),
    ("Bretagne", "Finistere", 48.20, -4.10, 0.93),
    ("Bretagne", "Ille-et-Vilaine", 48.11, -1.68, 0.97),
    ("Occitanie", "Haute-Garonne", 43.60, 1.44, 1.02),
    ("Occitanie", "Herault", 43.61, 3.88, 0.95),
    ("Hauts-de-France", "Nord", 50.63, 3.06, 0.94),
    ("Provence-Alpes-Cote d'Azur", "Bouches-du-Rhone", 43.30, 5.37, 1.00),
];

const TOWNS_PER_DEPARTMENT: usize = 40;
const BASE_SALARY: f64 = 13.0;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Measure columns in the order they are written, with their multiplier
/// relative to the town's mean salary.
fn measure_columns() -> Vec<(String, f64)> {
    let mut cols = Vec::new();
    for (g, gf) in GENDERS {
        cols.push((format!("mean_{g}_salary"), gf));
    }
    for (c, cf) in CATEGORIES {
        cols.push((format!("mean_{c}_salary"), cf));
    }
    for (a, af) in AGES {
        cols.push((format!("mean_{a}_age_salary"), af));
    }
    for (g, gf) in GENDERS {
        for (c, cf) in CATEGORIES {
            cols.push((format!("mean_{g}_{c}_salary"), gf * cf));
        }
    }
    cols
}

struct Town {
    name: String,
    region: &'static str,
    department: &'static str,
    latitude: f64,
    longitude: f64,
    population: i64,
    firms: i64,
    mean_salary: f64,
    measures: Vec<Option<f64>>,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn generate_towns(rng: &mut SimpleRng, columns: &[(String, f64)]) -> Vec<Town> {
    let mut towns = Vec::new();
    for (region, department, lat, lon, level) in DEPARTMENTS {
        for i in 0..TOWNS_PER_DEPARTMENT {
            // Log-normal population: many villages, a few cities.
            let population = rng.gauss(7.5, 1.6).exp().round().max(50.0) as i64;
            let size_bonus = 1.0 + 0.02 * (population as f64).ln();
            let mean_salary = round2(
                (BASE_SALARY * level * size_bonus + rng.gauss(0.0, 1.2)).max(8.5),
            );
            let measures = columns
                .iter()
                .map(|(_, factor)| {
                    // Small towns sometimes lack a breakdown.
                    if population < 400 && rng.next_f64() < 0.1 {
                        None
                    } else {
                        Some(round2((mean_salary * factor + rng.gauss(0.0, 0.6)).max(7.0)))
                    }
                })
                .collect();
            towns.push(Town {
                name: format!("{department}-{:02}", i + 1),
                region,
                department,
                latitude: lat + rng.gauss(0.0, 0.25),
                longitude: lon + rng.gauss(0.0, 0.35),
                population,
                firms: (population as f64 * (0.04 + 0.03 * rng.next_f64())).round() as i64,
                mean_salary,
                measures,
            });
        }
    }
    towns
}

fn write_csv(path: &str, towns: &[Town], columns: &[(String, f64)]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut header: Vec<String> = [
        "Town",
        "Region",
        "Department",
        "latitude",
        "longitude",
        "total_population",
        "total_firms",
        "mean_salary",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(columns.iter().map(|(name, _)| name.clone()));
    writer.write_record(&header)?;

    for t in towns {
        let mut record = vec![
            t.name.clone(),
            t.region.to_string(),
            t.department.to_string(),
            format!("{:.5}", t.latitude),
            format!("{:.5}", t.longitude),
            t.population.to_string(),
            t.firms.to_string(),
            t.mean_salary.to_string(),
        ];
        record.extend(
            t.measures
                .iter()
                .map(|m| m.map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &str, towns: &[Town], columns: &[(String, f64)]) -> anyhow::Result<()> {
    let mut fields = vec![
        Field::new("Town", DataType::Utf8, false),
        Field::new("Region", DataType::Utf8, false),
        Field::new("Department", DataType::Utf8, false),
        Field::new("latitude", DataType::Float64, false),
        Field::new("longitude", DataType::Float64, false),
        Field::new("total_population", DataType::Int64, false),
        Field::new("total_firms", DataType::Int64, false),
        Field::new("mean_salary", DataType::Float64, false),
    ];
    let mut arrays: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(towns.iter().map(|t| t.name.as_str()))),
        Arc::new(StringArray::from_iter_values(towns.iter().map(|t| t.region))),
        Arc::new(StringArray::from_iter_values(towns.iter().map(|t| t.department))),
        Arc::new(Float64Array::from_iter_values(towns.iter().map(|t| t.latitude))),
        Arc::new(Float64Array::from_iter_values(towns.iter().map(|t| t.longitude))),
        Arc::new(Int64Array::from_iter_values(towns.iter().map(|t| t.population))),
        Arc::new(Int64Array::from_iter_values(towns.iter().map(|t| t.firms))),
        Arc::new(Float64Array::from_iter_values(towns.iter().map(|t| t.mean_salary))),
    ];
    for (i, (name, _)) in columns.iter().enumerate() {
        fields.push(Field::new(name, DataType::Float64, true));
        arrays.push(Arc::new(Float64Array::from(
            towns.iter().map(|t| t.measures[i]).collect::<Vec<_>>(),
        )));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;
    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);
    let columns = measure_columns();
    let towns = generate_towns(&mut rng, &columns);

    std::fs::create_dir_all("datasets")?;
    let csv_path = "datasets/sample_towns.csv";
    let parquet_path = "datasets/sample_towns.parquet";
    write_csv(csv_path, &towns, &columns)?;
    write_parquet(parquet_path, &towns, &columns)?;

    log::info!("wrote {} towns with {} salary columns", towns.len(), columns.len());
    println!("Wrote {} towns to {csv_path} and {parquet_path}", towns.len());
    Ok(())
}
