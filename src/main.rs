use anyhow::Result;
use bakery_sqlite::{operations, NewCookie, Store, StoreConfig};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = StoreConfig::load()?;
    let store = Store::open(config)?;

    add_cookie(&store)?;
    multiple_insert(&store)?;
    bulk_save(&store)?;

    store.close()?;
    Ok(())
}

fn add_cookie(store: &Store) -> Result<()> {
    let cc_cookie = NewCookie::new(
        "chocolate chip",
        "http://some.aweso.me/cookie/recipe.html",
        "CC01",
        12,
        Decimal::new(50, 2),
    );
    let id = operations::add_cookie(store.conn(), &cc_cookie)?;
    println!("{id}");
    Ok(())
}

fn multiple_insert(store: &Store) -> Result<()> {
    let dcc = NewCookie::new(
        "dark chocolate chip",
        "http://some.aweso.me/cookie/recipe_dark.html",
        "CC02",
        1,
        Decimal::new(75, 2),
    );
    let mol = NewCookie::new(
        "molasses",
        "http://some.aweso.me/cookie/recipe_molasses.html",
        "MOL01",
        1,
        Decimal::new(80, 2),
    );
    for id in operations::insert_batch(store.conn(), &[dcc, mol])? {
        println!("{id}");
    }
    Ok(())
}

fn bulk_save(store: &Store) -> Result<()> {
    let c1 = NewCookie::new(
        "peanut butter",
        "http://some.aweso.me/cookie/peanut.html",
        "PB01",
        24,
        Decimal::new(25, 2),
    );
    let c2 = NewCookie::new(
        "oatmeal raisin",
        "http://some.okay.me/cookie/raisin.html",
        "EWW01",
        100,
        Decimal::new(100, 2),
    );
    let written = operations::bulk_insert(store.conn(), &[c1, c2])?;
    // bulk inserts do not report generated ids
    println!("{written} cookies saved, ids not populated");
    Ok(())
}
