//! Pyodide-backed implementation of the engine runtime.
//!
//! `pyodide.js` must be loaded by the page so that `loadPyodide` exists on
//! the global object.

use core::cell::RefCell;
use gloo::net::http::Request;
use js_sys::{Array, Function, Promise, Reflect, Uint8Array};
use pysweeper_core::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = loadPyodide, catch)]
    fn load_pyodide() -> Result<Promise, JsValue>;

    #[derive(Clone, Debug)]
    type Pyodide;

    #[wasm_bindgen(method, catch, js_name = runPython)]
    fn run_python(this: &Pyodide, code: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = unpackArchive)]
    fn unpack_archive(
        this: &Pyodide,
        buffer: &Uint8Array,
        format: &str,
    ) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn pyimport(this: &Pyodide, name: &str) -> Result<JsValue, JsValue>;
}

fn describe(err: JsValue) -> String {
    if let Some(message) = err.as_string() {
        return message;
    }
    match err.dyn_ref::<js_sys::Error>() {
        Some(err) => String::from(err.message()),
        None => format!("{:?}", err),
    }
}

fn engine_error(err: JsValue) -> GameError {
    GameError::Engine(describe(err))
}

/// Frees a PyProxy; plain JS values are left alone.
fn release(value: &JsValue) {
    let Ok(destroy) = Reflect::get(value, &JsValue::from_str("destroy")) else {
        return;
    };
    if let Some(destroy) = destroy.dyn_ref::<Function>() {
        if let Err(err) = destroy.call0(value) {
            log::warn!("failed to release proxy: {}", describe(err));
        }
    }
}

fn call_method(target: &JsValue, name: &str, args: &[JsValue]) -> Result<JsValue> {
    let method = Reflect::get(target, &JsValue::from_str(name)).map_err(engine_error)?;
    let result = match method.dyn_ref::<Function>() {
        Some(function) => {
            let args: Array = args.iter().collect();
            function.apply(target, &args).map_err(engine_error)
        }
        None => Err(GameError::Engine(format!("{} is not callable", name))),
    };
    release(&method);
    result
}

async fn settle(value: JsValue) -> Result<JsValue, JsValue> {
    match value.dyn_into::<Promise>() {
        Ok(promise) => JsFuture::from(promise).await,
        Err(value) => Ok(value),
    }
}

#[derive(Default)]
pub(crate) struct PyodideInterpreter {
    runtime: RefCell<Option<Pyodide>>,
}

impl PyodideInterpreter {
    fn runtime(&self) -> Result<Pyodide, BridgeError> {
        self.runtime
            .borrow()
            .clone()
            .ok_or_else(|| BridgeError::Interpreter("interpreter not started".into()))
    }
}

impl Interpreter for PyodideInterpreter {
    type Module = PyModule;

    async fn start(&self) -> Result<(), BridgeError> {
        if self.runtime.borrow().is_some() {
            return Ok(());
        }

        let promise = load_pyodide().map_err(|err| BridgeError::Interpreter(describe(err)))?;
        let pyodide: Pyodide = JsFuture::from(promise)
            .await
            .map_err(|err| BridgeError::Interpreter(describe(err)))?
            .unchecked_into();

        match pyodide.run_python("import sys\nsys.version") {
            Ok(version) => log::info!("python {}", version.as_string().unwrap_or_default()),
            Err(err) => log::warn!("could not query python version: {}", describe(err)),
        }

        *self.runtime.borrow_mut() = Some(pyodide);
        Ok(())
    }

    async fn unpack(&self, bundle: Vec<u8>, format: &str) -> Result<(), BridgeError> {
        let pyodide = self.runtime()?;
        let buffer = Uint8Array::from(bundle.as_slice());

        let pending = pyodide
            .unpack_archive(&buffer, format)
            .map_err(|err| BridgeError::Unpack(describe(err)))?;
        settle(pending)
            .await
            .map_err(|err| BridgeError::Unpack(describe(err)))?;

        if let Ok(listing) = pyodide.run_python("import os\nstr(os.listdir())") {
            log::info!("unpacked files: {}", listing.as_string().unwrap_or_default());
        }
        Ok(())
    }

    async fn import(
        &self,
        module_name: &str,
        factory_name: &str,
    ) -> Result<PyModule, BridgeError> {
        let pyodide = self.runtime()?;
        let module = pyodide
            .pyimport(module_name)
            .map_err(|err| BridgeError::Module(describe(err)))?;

        let factory = Reflect::get(&module, &JsValue::from_str(factory_name))
            .map_err(|err| BridgeError::Module(describe(err)))?;
        release(&module);

        match factory.dyn_into::<Function>() {
            Ok(factory) => Ok(PyModule { factory }),
            Err(_) => Err(BridgeError::Module(format!(
                "{}.{} is not callable",
                module_name, factory_name
            ))),
        }
    }
}

pub(crate) struct HttpFetcher;

impl BundleFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, BridgeError> {
        let response = Request::get(url)
            .send()
            .await
            .map_err(|err| BridgeError::Network(err.to_string()))?;

        if !response.ok() {
            return Err(BridgeError::Network(format!(
                "GET {} returned {} {}",
                url,
                response.status(),
                response.status_text()
            )));
        }

        response
            .binary()
            .await
            .map_err(|err| BridgeError::Network(err.to_string()))
    }
}

pub(crate) struct PyModule {
    factory: Function,
}

impl EngineModule for PyModule {
    fn create_session(
        &self,
        config: GameConfig,
        options: SessionOptions,
        on_end: EndCallback,
    ) -> Result<Box<dyn EngineSession>> {
        let on_end = Closure::<dyn Fn(JsValue)>::new(move |victory: JsValue| {
            on_end(victory.is_truthy())
        });

        let args = Array::new();
        args.push(&JsValue::from(config.rows));
        args.push(&JsValue::from(config.cols));
        args.push(&JsValue::from(config.mines));
        args.push(&JsValue::from(options.auto_reveal));
        args.push(&options.seed.map_or(JsValue::NULL, JsValue::from));
        args.push(on_end.as_ref());

        let game = self
            .factory
            .apply(&JsValue::NULL, &args)
            .map_err(engine_error)?;

        let mut session = PySession {
            rows: 0,
            cols: 0,
            game,
            _on_end: on_end,
        };
        session.rows = read_dimension(&session.game, "rows")?;
        session.cols = read_dimension(&session.game, "cols")?;
        Ok(Box::new(session))
    }
}

fn read_dimension(game: &JsValue, name: &str) -> Result<Coord> {
    Reflect::get(game, &JsValue::from_str(name))
        .map_err(engine_error)?
        .as_f64()
        .filter(|value| (1.0..=f64::from(Coord::MAX)).contains(value))
        .map(|value| value as Coord)
        .ok_or_else(|| GameError::Engine(format!("engine reported an invalid {}", name)))
}

struct PySession {
    rows: Coord,
    cols: Coord,
    game: JsValue,
    // kept alive for as long as the engine may call it
    _on_end: Closure<dyn Fn(JsValue)>,
}

impl PySession {
    fn call(&self, name: &str, pos: Position) -> Result<()> {
        let result = call_method(
            &self.game,
            name,
            &[JsValue::from(pos.row), JsValue::from(pos.col)],
        )?;
        release(&result);
        Ok(())
    }
}

impl EngineSession for PySession {
    fn rows(&self) -> Coord {
        self.rows
    }

    fn cols(&self) -> Coord {
        self.cols
    }

    fn tile_code(&self, pos: Position) -> Result<char> {
        let board = Reflect::get(&self.game, &JsValue::from_str("board")).map_err(engine_error)?;
        let row = call_method(&board, "get", &[JsValue::from(pos.row)]);
        release(&board);
        let row = row?;
        let code = call_method(&row, "get", &[JsValue::from(pos.col)]);
        release(&row);

        code?
            .as_string()
            .and_then(|code| code.chars().next())
            .ok_or_else(|| GameError::Engine(format!("tile {} is not a string", pos)))
    }

    fn reveal(&self, pos: Position) -> Result<()> {
        self.call("reveal", pos)
    }

    fn mark(&self, pos: Position) -> Result<()> {
        self.call("mark", pos)
    }

    fn hint(&self) -> Result<()> {
        let result = call_method(&self.game, "hint", &[])?;
        release(&result);
        Ok(())
    }
}

impl Drop for PySession {
    fn drop(&mut self) {
        release(&self.game);
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use js_sys::Object;
    use wasm_bindgen_test::*;

    fn game_with(name: &str, value: JsValue) -> JsValue {
        let game = Object::new();
        Reflect::set(&game, &JsValue::from_str(name), &value).unwrap();
        game.into()
    }

    #[wasm_bindgen_test]
    fn reads_dimension_in_range() {
        assert_eq!(read_dimension(&game_with("rows", JsValue::from(16)), "rows"), Ok(16));
        assert_eq!(read_dimension(&game_with("cols", JsValue::from(255)), "cols"), Ok(255));
    }

    #[wasm_bindgen_test]
    fn rejects_dimension_out_of_range_or_not_a_number() {
        let values = [
            JsValue::from(0),
            JsValue::from(-3),
            JsValue::from(256),
            JsValue::from_str("16"),
            JsValue::NULL,
        ];
        for value in values {
            assert!(matches!(
                read_dimension(&game_with("cols", value), "cols"),
                Err(GameError::Engine(_))
            ));
        }
        assert!(read_dimension(&Object::new().into(), "rows").is_err());
    }

    #[wasm_bindgen_test]
    fn describes_strings_and_errors() {
        assert_eq!(describe(JsValue::from_str("no module named game")), "no module named game");
        assert_eq!(describe(js_sys::Error::new("bad archive").into()), "bad archive");
    }
}
