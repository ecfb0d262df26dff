//! # Seed Data Generator
//!
//! Populates a cafe with a demo menu, a few days of sales and some expenses.
//!
//! ## Usage
//! ```bash
//! # Seed the owner "demo-owner" in ./data/cafe.db
//! cargo run -p cafe-db --bin seed
//!
//! # Seed an owner registered through the API
//! cargo run -p cafe-db --bin seed -- --owner 3f1c... --db ./data/cafe.db
//! ```
//!
//! ## Generated Data
//! - Menu items across coffee, tea, bakery and cold drinks, plus two
//!   ingredients bought in by purchase invoice
//! - `--sales` sales (default 25) with one to three lines each
//! - Rent, utilities and supplies expenses
//!
//! Every financial write goes through the recorder, so stock, cash entries
//! and running balance come out consistent.

use std::env;

use cafe_core::financial::LineRequest;
use cafe_core::{
    ExpenseCategory, InvoiceStatus, InvoiceType, Party, PaymentMethod, Product, Quantity,
};
use cafe_db::{
    Database, DbConfig, NewCashTransaction, NewExpense, NewInvoice, NewProduct, NewSale,
    ProductFilter,
};

/// (code, name, category, price cents, cost cents, stock units)
const MENU: &[(&str, &str, &str, i64, i64, i64)] = &[
    ("ESP", "Espresso", "coffee", 250, 60, 400),
    ("AMR", "Americano", "coffee", 300, 70, 400),
    ("CAP", "Cappuccino", "coffee", 380, 110, 300),
    ("LAT", "Latte", "coffee", 420, 120, 300),
    ("FLW", "Flat White", "coffee", 400, 115, 200),
    ("MOC", "Mocha", "coffee", 450, 140, 200),
    ("GRT", "Green Tea", "tea", 280, 50, 150),
    ("CHA", "Chai Latte", "tea", 420, 130, 150),
    ("CRO", "Croissant", "bakery", 320, 110, 60),
    ("MUF", "Blueberry Muffin", "bakery", 350, 120, 40),
    ("BRW", "Brownie", "bakery", 300, 90, 40),
    ("CHC", "Cheesecake Slice", "bakery", 550, 200, 20),
    ("OJ", "Fresh Orange Juice", "cold", 450, 180, 50),
    ("ICE", "Iced Latte", "cold", 460, 130, 100),
];

/// Ingredients bought by weight.
const INGREDIENTS: &[(&str, &str, i64, i64)] = &[
    ("BEANS-KG", "Coffee Beans (kg)", 2800, 2200),
    ("MILK-L", "Whole Milk (l)", 150, 110),
];

const PAYMENT_METHODS: &[PaymentMethod] = &[
    PaymentMethod::Cash,
    PaymentMethod::Card,
    PaymentMethod::Card,
    PaymentMethod::Other,
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut owner_id = String::from("demo-owner");
    let mut db_path = String::from("./data/cafe.db");
    let mut sales: usize = 25;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--owner" | "-o" => {
                if i + 1 < args.len() {
                    owner_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sales = args[i + 1].parse().unwrap_or(25);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Cafe Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -o, --owner <ID>   Owner id to seed (default: demo-owner)");
                println!("  -d, --db <PATH>    Database file path (default: ./data/cafe.db)");
                println!("  -s, --sales <N>    Number of sales to record (default: 25)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Cafe Seed Data Generator");
    println!("========================");
    println!("Database: {}", db_path);
    println!("Owner:    {}", owner_id);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    let existing = db.products().count(&owner_id).await?;
    if existing > 0 {
        println!("⚠ Owner already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    // Menu and ingredients
    for (code, name, category, price, cost, stock) in MENU {
        db.products()
            .insert(
                &owner_id,
                NewProduct {
                    code: code.to_string(),
                    name: name.to_string(),
                    description: None,
                    category: Some(category.to_string()),
                    price_cents: *price,
                    cost_cents: *cost,
                    stock_quantity: Quantity::from_units(*stock),
                    minimum_stock: Quantity::from_units(stock / 10),
                },
            )
            .await?;
    }
    for (code, name, price, cost) in INGREDIENTS {
        db.products()
            .insert(
                &owner_id,
                NewProduct {
                    code: code.to_string(),
                    name: name.to_string(),
                    description: None,
                    category: Some("ingredients".to_string()),
                    price_cents: *price,
                    cost_cents: *cost,
                    stock_quantity: Quantity::zero(),
                    minimum_stock: Quantity::from_units(5),
                },
            )
            .await?;
    }
    println!("✓ Created {} products", MENU.len() + INGREDIENTS.len());

    let products = db.products().list(&owner_id, &ProductFilter::default()).await?;
    let (ingredients, menu): (Vec<Product>, Vec<Product>) = products
        .into_iter()
        .partition(|p| p.category.as_deref() == Some("ingredients"));

    let recorder = db.recorder();

    // Opening float
    recorder
        .record_cash_transaction(
            &owner_id,
            &owner_id,
            NewCashTransaction {
                transaction_type: cafe_core::CashTransactionType::Deposit,
                amount_cents: 20_000,
                category: "float".to_string(),
                description: Some("Opening float".to_string()),
            },
        )
        .await?;

    // Stock the ingredients through a paid purchase invoice
    let purchase_lines: Vec<LineRequest> = ingredients
        .iter()
        .map(|p| LineRequest {
            product_id: p.id.clone(),
            quantity: Quantity::from_hundredths(1_250),
            discount_bps: 0,
        })
        .collect();
    let purchase = recorder
        .record_invoice(
            &owner_id,
            &owner_id,
            NewInvoice {
                invoice_type: InvoiceType::Purchase,
                party: Party {
                    name: "Roastery Wholesale".to_string(),
                    phone: Some("+1 555 0100".to_string()),
                    email: None,
                    address: None,
                },
                items: purchase_lines,
                discount_bps: 0,
                tax_cents: 0,
                paid_cents: 0,
                payment_method: PaymentMethod::BankTransfer,
                status: InvoiceStatus::Confirmed,
                due_date: None,
                notes: None,
            },
        )
        .await?;
    println!("✓ Recorded purchase invoice {}", purchase.invoice_number);

    // Sales
    let mut recorded = 0;
    for n in 0..sales {
        let lines = 1 + n % 3;
        let items: Vec<LineRequest> = (0..lines)
            .map(|k| {
                let product = &menu[(n * 7 + k * 3) % menu.len()];
                LineRequest {
                    product_id: product.id.clone(),
                    quantity: Quantity::from_units(1 + ((n + k) % 2) as i64),
                    discount_bps: if n % 10 == 0 { 1000 } else { 0 },
                }
            })
            .collect();
        let new_sale = NewSale {
            items,
            payment_method: PAYMENT_METHODS[n % PAYMENT_METHODS.len()],
            ..Default::default()
        };

        match recorder.record_sale(&owner_id, &owner_id, new_sale).await {
            Ok(sale) => {
                // Settle most sales in full
                if n % 5 != 0 {
                    recorder
                        .update_sale(
                            &owner_id,
                            &sale.id,
                            cafe_db::SaleUpdate {
                                paid_cents: Some(sale.total_cents),
                                ..Default::default()
                            },
                        )
                        .await?;
                }
                recorded += 1;
            }
            Err(e) => eprintln!("Failed to record sale {}: {}", n, e),
        }
    }
    println!("✓ Recorded {} sales", recorded);

    // Expenses
    let expenses = [
        ("Monthly rent", 150_000, ExpenseCategory::Rent),
        ("Electricity", 18_500, ExpenseCategory::Utilities),
        ("Cups and lids", 4_200, ExpenseCategory::Supplies),
    ];
    for (description, amount, category) in expenses {
        recorder
            .record_expense(
                &owner_id,
                &owner_id,
                NewExpense {
                    description: description.to_string(),
                    amount_cents: amount,
                    category,
                    payment_method: PaymentMethod::BankTransfer,
                    expense_date: None,
                    recurrence: None,
                    notes: None,
                },
            )
            .await?;
    }
    println!("✓ Recorded {} expenses", expenses.len());

    let balance = db.cash_register().balance(&owner_id).await?;
    println!();
    println!("Cash balance: {}", balance);
    println!("✓ Seed complete!");

    Ok(())
}
