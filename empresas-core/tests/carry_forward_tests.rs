// tests/carry_forward_tests.rs
// Opening cash and stock carried between periods.

use serde_json::{Map, Value, json};

use empresas_core::config::{CarryForwardConfig, CompanyConfig};
use empresas_core::services::carry_forward::{
    OPENING_CASH_FIELD, finished_goods_field_key, stock_field_key,
};
use empresas_core::services::decisions::sections;
use empresas_core::services::{
    CarryForward, CompanyId, CompanyRegistry, Database, DecisionStore, StatementStore,
    StatementType, ensure_schema,
};

struct Fixture {
    _dir: tempfile::TempDir,
    decisions: DecisionStore,
    statements: StatementStore,
    carry: CarryForward,
    id: CompanyId,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("captop.db"));
    ensure_schema(&db).expect("schema");
    let id = CompanyRegistry::new(db.clone(), CompanyConfig::default())
        .create_company("Acme")
        .expect("company");
    let decisions = DecisionStore::new(db.clone());
    let statements = StatementStore::new(db);
    let carry = CarryForward::new(
        decisions.clone(),
        statements.clone(),
        CarryForwardConfig::default(),
    );
    Fixture {
        _dir: dir,
        decisions,
        statements,
        carry,
        id,
    }
}

fn obj(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        other => panic!("not an object: {other}"),
    }
}

#[test]
fn field_keys_match_form_labels() {
    assert_eq!(stock_field_key("home", "Argentina"), "home_stock_periodo_anterior_argentina");
    assert_eq!(stock_field_key("pro", "México"), "pro_stock_periodo_anterior_mexico");
    assert_eq!(finished_goods_field_key("pro", "Brasil"), "pro_productos_terminados_brasil");
}

#[test]
fn opening_balance_reads_own_period_balance_sheet() {
    let f = fixture();

    assert_eq!(f.carry.opening_balance(f.id, 1).unwrap(), 0.0);

    let mut sheet = Map::new();
    sheet.insert(OPENING_CASH_FIELD.to_string(), json!(1234.5));
    f.statements
        .save_statement(f.id, 2, &StatementType::BalanceSheet, sheet)
        .unwrap();

    assert_eq!(f.carry.opening_balance(f.id, 2).unwrap(), 1234.5);
    assert_eq!(f.carry.opening_balance(f.id, 3).unwrap(), 0.0);
}

#[test]
fn opening_balance_coerces_text_and_ignores_garbage() {
    let f = fixture();

    f.statements
        .save_statement(
            f.id,
            1,
            &StatementType::BalanceSheet,
            obj(json!({ OPENING_CASH_FIELD: "98,5" })),
        )
        .unwrap();
    assert_eq!(f.carry.opening_balance(f.id, 1).unwrap(), 98.5);

    f.statements
        .save_statement(
            f.id,
            2,
            &StatementType::BalanceSheet,
            obj(json!({ OPENING_CASH_FIELD: "sin dato" })),
        )
        .unwrap();
    assert_eq!(f.carry.opening_balance(f.id, 2).unwrap(), 0.0);

    // Field name is case-sensitive.
    f.statements
        .save_statement(
            f.id,
            3,
            &StatementType::BalanceSheet,
            obj(json!({ "activo_circulante_disponible": 50 })),
        )
        .unwrap();
    assert_eq!(f.carry.opening_balance(f.id, 3).unwrap(), 0.0);
}

#[test]
fn prior_stock_reads_summary_of_same_period() {
    let f = fixture();

    f.decisions
        .save_section(
            f.id,
            1,
            sections::SUMMARY,
            obj(json!({ "home_stock_periodo_anterior_argentina": 999 })),
        )
        .unwrap();
    f.decisions
        .save_section(
            f.id,
            2,
            sections::SUMMARY,
            obj(json!({
                "home_stock_periodo_anterior_argentina": "120",
                "home_stock_periodo_anterior_chile": 30,
                "pro_stock_periodo_anterior_mexico": 7.5,
            })),
        )
        .unwrap();

    let stock = f.carry.prior_period_stock(f.id, 2).unwrap();
    assert_eq!(stock.period, 2);
    assert_eq!(stock.entries.len(), 10);
    assert_eq!(stock.get("home", "Argentina"), 120.0);
    assert_eq!(stock.get("home", "Chile"), 30.0);
    assert_eq!(stock.get("home", "Brasil"), 0.0);
    assert_eq!(stock.get("pro", "Mexico"), 7.5);
    assert_eq!(stock.total_for("home"), 150.0);

    // Nothing recorded for period 3 yet.
    let empty = f.carry.prior_period_stock(f.id, 3).unwrap();
    assert!(empty.entries.iter().all(|e| e.units == 0.0));
}

#[test]
fn finished_goods_read_previous_period() {
    let f = fixture();

    f.decisions
        .save_section(
            f.id,
            1,
            sections::PREVIOUS_PERIOD,
            obj(json!({ "pro_productos_terminados_brasil": 44 })),
        )
        .unwrap();

    let goods = f.carry.previous_period_finished_goods(f.id, 2).unwrap();
    assert_eq!(goods.get("pro", "Brasil"), 44.0);
    assert_eq!(goods.total_for("home"), 0.0);

    assert_eq!(f.carry.previous_period_finished_goods(f.id, 1).unwrap().total_for("pro"), 0.0);
    assert_eq!(f.carry.previous_period_finished_goods(f.id, 0).unwrap().total_for("pro"), 0.0);
}

#[test]
fn custom_grid_follows_config() {
    let f = fixture();
    let grid = CarryForwardConfig {
        product_lines: vec!["home".into()],
        countries: vec!["Perú".into()],
    };
    let carry = CarryForward::new(f.decisions.clone(), f.statements.clone(), grid);

    f.decisions
        .save_section(
            f.id,
            4,
            sections::SUMMARY,
            obj(json!({ "home_stock_periodo_anterior_peru": 12 })),
        )
        .unwrap();

    let stock = carry.prior_period_stock(f.id, 4).unwrap();
    assert_eq!(stock.entries.len(), 1);
    assert_eq!(stock.entries[0].key, "home_stock_periodo_anterior_peru");
    assert_eq!(stock.get("home", "Perú"), 12.0);
}
