use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use todokit_api::{
    AuthSession, ClientError, DynamicOptions, EndpointName, RequestOptions, SessionError,
    SigninForm, SignupForm, TodoCreate, TodoDelete, TodoForm, TodoGetAll, TodoGetOne, TodoId,
    TodoUpdate, UserGetById, UserGetUsers, UserId, UserListQuery,
};

use crate::{Command, TodoCommand, UserCommand};

pub async fn run(command: Command, session: &AuthSession) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let password = password_or_prompt(password)?;
            let user = session
                .sign_in(SigninForm::new(email, password))
                .await
                .map_err(session_error)?;
            println!("signed in as {} <{}>", user.name, user.email);
        }
        Command::Signup {
            name,
            email,
            password,
            profile_image_url,
        } => {
            let password = password_or_prompt(password)?;
            let user = session
                .sign_up(SignupForm {
                    name,
                    email,
                    password,
                    profile_image_url,
                })
                .await
                .map_err(session_error)?;
            println!("signed up as {} <{}>", user.name, user.email);
        }
        Command::Logout => {
            session.sign_out().await.map_err(session_error)?;
            println!("signed out");
        }
        Command::Whoami => match session.current_user() {
            Some(user) => print_json(&serde_json::json!({
                "id": user.id,
                "name": user.name,
                "email": user.email,
                "role": user.role,
            }))?,
            None => println!("not signed in"),
        },
        Command::Todo(cmd) => todo(cmd, session).await?,
        Command::User(cmd) => user(cmd, session).await?,
        Command::Endpoints => {
            for name in EndpointName::ALL {
                let d = name.descriptor();
                println!("{:<20} {:<8} {}", d.name, d.method, d.path);
            }
        }
        Command::Call {
            endpoint,
            params,
            body,
        } => call(session, &endpoint, params, body.as_deref()).await?,
    }
    Ok(())
}

async fn todo(cmd: TodoCommand, session: &AuthSession) -> Result<()> {
    let client = session.client();
    match cmd {
        TodoCommand::List => {
            let todos = client
                .execute(RequestOptions::<TodoGetAll>::new())
                .await
                .map_err(client_error)?;
            for todo in todos {
                println!("{:>5}  {}", todo.id, todo.item);
            }
        }
        TodoCommand::Get { id } => {
            let todo = client
                .execute(RequestOptions::<TodoGetOne>::new().path(TodoId { todo_id: id }))
                .await
                .map_err(client_error)?;
            print_json(&todo)?;
        }
        TodoCommand::Add { item } => {
            let todo = client
                .execute(RequestOptions::<TodoCreate>::new().body(TodoForm::new(item)))
                .await
                .map_err(client_error)?;
            println!("created #{}", todo.id);
        }
        TodoCommand::Update { id, item } => {
            let todo = client
                .execute(
                    RequestOptions::<TodoUpdate>::new()
                        .path(TodoId { todo_id: id })
                        .body(TodoForm::new(item)),
                )
                .await
                .map_err(client_error)?;
            print_json(&todo)?;
        }
        TodoCommand::Delete { id } => {
            let deleted = client
                .execute(RequestOptions::<TodoDelete>::new().path(TodoId { todo_id: id }))
                .await
                .map_err(client_error)?;
            println!("{}", if deleted { "deleted" } else { "not deleted" });
        }
    }
    Ok(())
}

async fn user(cmd: UserCommand, session: &AuthSession) -> Result<()> {
    let client = session.client();
    match cmd {
        UserCommand::List { skip, limit } => {
            let users = client
                .execute(RequestOptions::<UserGetUsers>::new().body(UserListQuery { skip, limit }))
                .await
                .map_err(client_error)?;
            for user in users {
                println!("{:<38} {:<8} {} <{}>", user.id, user.role, user.name, user.email);
            }
        }
        UserCommand::Get { user_id } => {
            let status = client
                .execute(RequestOptions::<UserGetById>::new().path(UserId { user_id }))
                .await
                .map_err(client_error)?;
            print_json(&status)?;
        }
    }
    Ok(())
}

async fn call(
    session: &AuthSession,
    endpoint: &str,
    params: Vec<(String, String)>,
    body: Option<&str>,
) -> Result<()> {
    let descriptor = endpoint.parse::<EndpointName>()?.descriptor();

    let mut options = DynamicOptions::new();
    for (name, raw) in params {
        // Undeclared names go through as strings and are reported by the client
        let value = match descriptor.path_param(&name) {
            Some(spec) => spec
                .kind
                .parse(&raw)
                .ok_or_else(|| anyhow!("`{name}` must be a {}, got `{raw}`", spec.kind))?,
            None => serde_json::Value::String(raw),
        };
        options = options.path_param(name, value);
    }
    if let Some(body) = body {
        options = options.body(serde_json::from_str(body).context("--body is not valid JSON")?);
    }

    let result = session
        .client()
        .execute_dynamic(endpoint, options)
        .await
        .map_err(client_error)?;
    match result {
        Some(value) => print_json(&value)?,
        None => println!("(no content)"),
    }
    Ok(())
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    eprint!("password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_owned();
    if password.is_empty() {
        anyhow::bail!("empty password");
    }
    Ok(password)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn client_error(err: ClientError) -> anyhow::Error {
    let message = err.message();
    anyhow::Error::new(err).context(message)
}

fn session_error(err: SessionError) -> anyhow::Error {
    let message = err.message();
    anyhow::Error::new(err).context(message)
}
