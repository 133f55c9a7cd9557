//! Account commands: session, profile and saved addresses.

use clap::{Args, Subcommand};
use mystery_box_core::{AddressId, AddressInput, CustomerInput};
use mystery_box_storefront::Storefront;
use mystery_box_storefront::error::Result;

use crate::output;

#[derive(Subcommand)]
pub enum AccountAction {
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "MYSTERY_BOX_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        email: String,
        /// At least 8 characters
        #[arg(short, long, env = "MYSTERY_BOX_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the signed-in customer
    Me,
    /// Manage saved addresses
    Address {
        #[command(subcommand)]
        action: AddressAction,
    },
}

#[derive(Subcommand)]
pub enum AddressAction {
    /// Save a new address
    Add(AddressArgs),
    /// Replace a saved address
    Update {
        /// Address id
        id: String,
        #[command(flatten)]
        address: AddressArgs,
    },
    /// Delete a saved address
    Delete {
        /// Address id
        id: String,
    },
    /// Make an address the default
    #[command(name = "default")]
    SetDefault {
        /// Address id
        id: String,
    },
}

#[derive(Args)]
pub struct AddressArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    company: Option<String>,
    /// Street address
    #[arg(long)]
    address_1: String,
    #[arg(long)]
    address_2: Option<String>,
    #[arg(long)]
    city: String,
    #[arg(long)]
    province: Option<String>,
    #[arg(long)]
    postal_code: String,
    /// Two-letter country code
    #[arg(long)]
    country_code: String,
    #[arg(long)]
    phone: Option<String>,
}

impl From<AddressArgs> for AddressInput {
    fn from(args: AddressArgs) -> Self {
        Self {
            first_name: args.first_name,
            last_name: args.last_name,
            company: args.company,
            address_1: args.address_1,
            address_2: args.address_2,
            city: args.city,
            province: args.province,
            postal_code: args.postal_code,
            country_code: args.country_code,
            phone: args.phone,
        }
    }
}

pub async fn run(storefront: &Storefront, action: AccountAction) -> Result<()> {
    let account = storefront.account();

    let customer = match action {
        AccountAction::Login { email, password } => {
            let customer = account.login(&email, &password).await?;
            println!("Signed in as {}.", customer.display_name());
            customer
        }
        AccountAction::Register {
            email,
            password,
            first_name,
            last_name,
            phone,
        } => {
            let input = CustomerInput {
                email,
                password,
                first_name,
                last_name,
                phone,
            };
            let customer = account.register(&input).await?;
            println!("Welcome, {}.", customer.display_name());
            customer
        }
        AccountAction::Logout => {
            account.logout().await?;
            println!("Signed out.");
            return Ok(());
        }
        AccountAction::Me => account.refresh_customer().await?,
        AccountAction::Address { action } => match action {
            AddressAction::Add(address) => account.add_address(&address.into()).await?,
            AddressAction::Update { id, address } => {
                account
                    .update_address(&AddressId::new(id), &address.into())
                    .await?
            }
            AddressAction::Delete { id } => account.delete_address(&AddressId::new(id)).await?,
            AddressAction::SetDefault { id } => {
                account.set_default_address(&AddressId::new(id)).await?
            }
        },
    };

    output::customer(&customer);
    Ok(())
}
