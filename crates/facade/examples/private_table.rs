use dp_table::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dataset = Dataset::new()
        .with_column("Name", ["Tom", "Jack", "Steve", "Jack"])?
        .with_column("Age", [28, 34, 29, 42])?;
    let domains = [
        (
            "Name",
            DataDomain::from(CategoricalDataDomain::new([
                "Tom", "Jack", "Steve", "Eve", "Adam", "Lucifer",
            ])),
        ),
        ("Age", DataDomain::from(RealDataDomain::new(0.0, 130.0)?)),
    ];

    let mut table = PrivateTable::new(dataset, domains, PrivacyBudget::new(10.0, 1e-3)?)?;

    let mean = table.mean("Age", &PrivacyBudget::pure(1.0)?)?;
    println!("noisy mean age: {mean:.2}");

    let hist = table.cat_hist("Name", &PrivacyBudget::pure(1.0)?)?;
    println!("noisy name histogram: {hist:.2?}");

    let median = table.median("Age", &PrivacyBudget::new(1.0, 1e-4)?)?;
    println!("noisy median age: {median:.2}");

    match table.max("Age", &PrivacyBudget::pure(100.0)?) {
        Ok(v) => println!("noisy max age: {v:.2}"),
        Err(e) => println!("query refused: {e}"),
    }
    println!(
        "consumed {} of {}",
        table.consumed_privacy_budget(),
        table.total_privacy_budget()
    );
    Ok(())
}
