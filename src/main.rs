use clap::{Parser as ClapParser, Subcommand};
use sqljson_path::{
    Value,
    cli::{self, CliError, QueryOptions, QueryResult},
    to_json, to_json_pretty,
};
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "sqljp")]
#[command(about = "sqljp - run SQL/JSON path expressions against JSON documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a path and run it against a JSON document
    Query {
        /// The SQL/JSON path, e.g. 'lax $.items[*] ? (@.price > 10)'
        path: String,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Bind $NAME to a JSON value (repeatable)
        #[arg(long = "var", value_name = "NAME=JSON")]
        variables: Vec<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only validate syntax, don't execute
        #[arg(long)]
        syntax_only: bool,

        /// Print true or false depending on whether anything matched
        #[arg(long)]
        exists: bool,
    },

    /// Print the token stream of a path
    Tokens {
        /// The SQL/JSON path
        path: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Query {
            path,
            input,
            variables,
            pretty,
            syntax_only,
            exists,
        } => run_query(
            QueryOptions {
                path,
                input,
                variables,
                syntax_only,
                exists,
            },
            pretty,
        ),
        Commands::Tokens { path } => cli::describe_tokens(&path).map(|lines| {
            for line in lines {
                println!("{}", line);
            }
        }),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_query(mut options: QueryOptions, pretty: bool) -> Result<(), CliError> {
    if options.input.is_none() && !options.syntax_only && !atty::is(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        options.input = Some(buffer);
    }

    let output = match cli::execute_query(&options)? {
        QueryResult::SyntaxValid => {
            println!("Syntax is valid");
            return Ok(());
        }
        QueryResult::Exists(found) => Value::Boolean(found),
        QueryResult::Items(items) => Value::Array(items),
    };
    let json = if pretty {
        to_json_pretty(&output)
    } else {
        to_json(&output)
    };
    println!("{}", json);
    Ok(())
}
