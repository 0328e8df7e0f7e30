// tests/registry_tests.rs
// Company registry: creation rules, listing order, period progression.

use empresas_core::StoreError;
use empresas_core::config::CompanyConfig;
use empresas_core::services::{CompanyRegistry, Database, ensure_schema};

fn registry(dir: &tempfile::TempDir) -> CompanyRegistry {
    let db = Database::new(dir.path().join("captop.db"));
    ensure_schema(&db).expect("schema");
    CompanyRegistry::new(db, CompanyConfig::default())
}

#[test]
fn create_company_seeds_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(&dir);

    let id = reg.create_company("  Acme Norte  ").unwrap();
    let c = reg.get_company_info(id).unwrap().expect("company exists");

    assert_eq!(c.name, "Acme Norte");
    assert_eq!(c.cash_usd, 100_000.0);
    assert_eq!(c.current_period, 0);
    assert_eq!(c.reporting_currency_exchange_rate, 950.0);
}

#[test]
fn seed_values_follow_config() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("captop.db"));
    ensure_schema(&db).unwrap();
    let seed = CompanyConfig {
        starting_cash_usd: 5_000.0,
        starting_period: 1,
        exchange_rate: 900.0,
    };
    let reg = CompanyRegistry::new(db, seed);

    let id = reg.create_company("Sur").unwrap();
    let c = reg.get_company_info(id).unwrap().unwrap();
    assert_eq!(c.cash_usd, 5_000.0);
    assert_eq!(c.current_period, 1);
    assert_eq!(c.reporting_currency_exchange_rate, 900.0);
}

#[test]
fn duplicate_names_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(&dir);

    reg.create_company("Andina").unwrap();
    let err = reg.create_company("Andina ").unwrap_err();
    assert!(matches!(err, StoreError::DuplicateName(ref n) if n == "Andina"), "got {err:?}");
    assert!(!err.is_storage());
    assert_eq!(reg.get_companies().unwrap().len(), 1);
}

#[test]
fn invalid_names_are_validation_errors() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(&dir);

    let too_long = "x".repeat(51);
    for bad in ["", "   ", "ab", "Acme!", "a-b-c", too_long.as_str()] {
        let err = reg.create_company(bad).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)), "{bad:?} gave {err:?}");
    }
    // Boundaries and non-ASCII letters are fine.
    reg.create_company("abc").unwrap();
    reg.create_company(&"y".repeat(50)).unwrap();
    reg.create_company("Compañía Ñandú 2").unwrap();
    assert_eq!(reg.get_companies().unwrap().len(), 3);
}

#[test]
fn companies_are_listed_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(&dir);

    let zeta = reg.create_company("Zeta").unwrap();
    let alfa = reg.create_company("Alfa").unwrap();
    let mid = reg.create_company("Meridiano").unwrap();

    let list = reg.get_companies().unwrap();
    assert_eq!(
        list,
        vec![
            (alfa, "Alfa".to_string()),
            (mid, "Meridiano".to_string()),
            (zeta, "Zeta".to_string()),
        ]
    );
}

#[test]
fn lookup_by_name_and_unknown_id() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(&dir);

    let id = reg.create_company("Pampa").unwrap();
    assert_eq!(reg.get_company_by_name(" Pampa").unwrap().map(|c| c.id), Some(id));
    assert!(reg.get_company_by_name("Patagonia").unwrap().is_none());
    assert!(reg.get_company_info(id + 100).unwrap().is_none());
}

#[test]
fn increment_period_moves_one_step() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(&dir);

    let id = reg.create_company("Litoral").unwrap();
    for expected in 1..=3u32 {
        reg.increment_period(id).unwrap();
        assert_eq!(reg.get_company_info(id).unwrap().unwrap().current_period, expected);
    }

    let err = reg.increment_period(id + 1).unwrap_err();
    assert!(matches!(err, StoreError::CompanyNotFound(x) if x == id + 1));
}

#[test]
fn cash_and_exchange_rate_updates() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(&dir);
    let id = reg.create_company("Cuyo").unwrap();

    reg.set_cash(id, -250.5).unwrap();
    reg.set_exchange_rate(id, 1010.0).unwrap();
    let c = reg.get_company_info(id).unwrap().unwrap();
    assert_eq!(c.cash_usd, -250.5);
    assert_eq!(c.reporting_currency_exchange_rate, 1010.0);

    assert!(matches!(reg.set_cash(id, f64::NAN), Err(StoreError::Validation(_))));
    assert!(matches!(reg.set_exchange_rate(id, 0.0), Err(StoreError::Validation(_))));
    assert!(matches!(reg.set_exchange_rate(id, -1.0), Err(StoreError::Validation(_))));
    assert!(matches!(reg.set_cash(id + 9, 1.0), Err(StoreError::CompanyNotFound(_))));
}
